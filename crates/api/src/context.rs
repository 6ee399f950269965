use shopledger_core::UserId;

/// Header carrying the authenticated operator's id, set by the upstream
/// authentication proxy.
pub const OPERATOR_HEADER: &str = "x-operator-id";

/// Operator (cashier, admin) on whose behalf a request runs.
///
/// Present on every write request; optional on reads.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OperatorContext {
    user_id: UserId,
}

impl OperatorContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
