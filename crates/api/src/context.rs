use storefront_core::UserId;

/// Identity of the caller, taken from the `x-user-id` header.
///
/// Present on every order route; user-scoped routes additionally require it to
/// match the user in the path.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    user_id: UserId,
}

impl ActorContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Whether the caller may act on resources owned by `owner`.
    pub fn is(&self, owner: UserId) -> bool {
        self.user_id == owner
    }
}
