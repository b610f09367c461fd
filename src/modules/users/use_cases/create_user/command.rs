// Command data type for creating a user.
//
// Purpose
// - Express intent to register a user under an email address.
//
// Responsibilities
// - Carry input data for the decider and the handler.
// - Stay independent of any transport layer.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}
