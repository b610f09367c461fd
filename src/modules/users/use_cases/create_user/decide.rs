// Pure decision function for user creation.
//
// Purpose
// - Validate the command and produce the user and its events on success.
//
// Responsibilities
// - Reject an empty or malformed email.
// - Build the `User` from the command plus the given id and timestamp.
// - Never perform input or output. Email uniqueness is enforced by storage.

use crate::modules::users::core::events::{UserCreated, UserEvent};
use crate::modules::users::core::user::User;
use crate::modules::users::use_cases::create_user::command::CreateUser;
use crate::modules::users::use_cases::create_user::decision::{CreateUserRejection, Decision};
use chrono::{DateTime, Utc};
use uuid::Uuid;

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub fn decide_create_user(command: CreateUser, id: Uuid, created_at: DateTime<Utc>) -> Decision {
    let email = command.email.trim().to_string();
    if !is_valid_email(&email) {
        return Decision::Rejected {
            reason: CreateUserRejection::InvalidEmail,
        };
    }

    let user = User {
        id,
        email: email.clone(),
        first_name: command.first_name.clone(),
        last_name: command.last_name.clone(),
        created_at,
    };
    let event = UserCreated {
        email,
        first_name: command.first_name,
        last_name: command.last_name,
    };
    Decision::Accepted {
        user,
        events: vec![UserEvent::UserCreated(event)],
    }
}
