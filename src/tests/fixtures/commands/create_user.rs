// Shared test fixture for the CreateUser command, seeded from
// `json/create_user.json`.

use crate::modules::users::use_cases::create_user::command::CreateUser;
use serde::Deserialize;
use std::fs;

// JSON -> DTO (transport shape)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserDto {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

pub struct CreateUserBuilder {
    inner: CreateUser,
}

impl Default for CreateUserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl CreateUserBuilder {
    pub fn new() -> Self {
        let path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/src/tests/fixtures/commands/json/create_user.json"
        );
        let json_str = fs::read_to_string(path).unwrap();
        let dto: CreateUserDto = serde_json::from_str(&json_str).unwrap();

        Self {
            inner: CreateUser {
                email: dto.email,
                first_name: dto.first_name,
                last_name: dto.last_name,
            },
        }
    }

    pub fn email(mut self, v: impl Into<String>) -> Self {
        self.inner.email = v.into();
        self
    }

    pub fn first_name(mut self, v: impl Into<String>) -> Self {
        self.inner.first_name = v.into();
        self
    }

    pub fn last_name(mut self, v: impl Into<String>) -> Self {
        self.inner.last_name = v.into();
        self
    }

    pub fn build(self) -> CreateUser {
        self.inner
    }
}

#[cfg(test)]
mod create_user_builder_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_delegates_to_new_and_parses_json() {
        let built = CreateUserBuilder::default().build();
        assert_eq!(built.email, "teddy.test@example.com");
        assert_eq!(built.first_name, "Teddy");
        assert_eq!(built.last_name, "Test");
    }

    #[rstest]
    fn setters_override_all_fields_and_build_returns_inner() {
        let custom = CreateUserBuilder::new()
            .email("tess@example.com")
            .first_name("Tess")
            .last_name("Tester")
            .build();

        assert_eq!(custom.email, "tess@example.com");
        assert_eq!(custom.first_name, "Tess");
        assert_eq!(custom.last_name, "Tester");
    }
}
