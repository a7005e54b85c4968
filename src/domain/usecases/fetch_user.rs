//
// Copyright (c) 2024 Nathan Fiedler
//
use crate::domain::entities::User;
use crate::domain::repositories::UserRepository;
use anyhow::Error;
use std::fmt;
use std::sync::Arc;

///
/// Use case to look up a single user record by identifier or by email.
///
pub struct FetchUser {
    records: Arc<dyn UserRepository>,
}

impl FetchUser {
    pub fn new(records: Arc<dyn UserRepository>) -> Self {
        Self { records }
    }
}

impl super::UseCase<User, Params> for FetchUser {
    fn call(&self, params: Params) -> Result<User, Error> {
        match params {
            Params::ById(user_id) => Ok(self.records.get_user(user_id)?),
            Params::ByEmail(email) => {
                let email = email.trim();
                match self.records.get_user_by_email(email)? {
                    Some(user) => Ok(user),
                    None => Err(Error::msg(format!("no user with email {}", email))),
                }
            }
        }
    }
}

/// Key by which to find the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Params {
    ById(i64),
    ByEmail(String),
}

impl Params {
    /// Numeric input selects by identifier, anything else by email.
    pub fn parse(key: &str) -> Self {
        match key.trim().parse::<i64>() {
            Ok(id) => Params::ById(id),
            Err(_) => Params::ByEmail(key.trim().to_owned()),
        }
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Params::ById(id) => write!(f, "Params(id: {})", id),
            Params::ByEmail(email) => write!(f, "Params(email: {})", email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::UseCase;
    use super::*;
    use crate::domain::repositories::MockUserRepository;

    fn john(id: i64) -> User {
        User {
            id,
            first_name: "John".into(),
            last_name: "Doe".into(),
            email: "john.doe@example.com".into(),
            phone: "1234567890".into(),
            dob: "1990-01-01".into(),
            address: "".into(),
        }
    }

    #[test]
    fn test_parse_params() {
        assert_eq!(Params::parse(" 12 "), Params::ById(12));
        assert_eq!(
            Params::parse("john.doe@example.com"),
            Params::ByEmail("john.doe@example.com".into())
        );
        assert_eq!(Params::ById(3).to_string(), "Params(id: 3)");
    }

    #[test]
    fn test_fetch_by_id_missing() {
        // arrange
        let mut records = MockUserRepository::new();
        records
            .expect_get_user()
            .returning(|id| Err(crate::Error::UserNotFound(id)));
        // act
        let usecase = FetchUser::new(Arc::new(records));
        let result = usecase.call(Params::ById(5));

        // assert
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().to_string(), "no such user: 5");
    }

    #[test]
    fn test_fetch_by_id() {
        // arrange
        let mut records = MockUserRepository::new();
        records.expect_get_user().returning(|user_id| Ok(john(user_id)));
        // act
        let usecase = FetchUser::new(Arc::new(records));
        let result = usecase.call(Params::ById(5));

        // assert
        let user = result.unwrap();
        assert_eq!(user.id, 5);
        assert_eq!(user.full_name(), "John Doe");
    }

    #[test]
    fn test_fetch_by_email() {
        // arrange
        let mut records = MockUserRepository::new();
        records
            .expect_get_user_by_email()
            .returning(|_| Ok(Some(john(2))));
        // act
        let usecase = FetchUser::new(Arc::new(records));
        let result = usecase.call(Params::ByEmail("john.doe@example.com".into()));

        // assert
        assert_eq!(result.unwrap().id, 2);
    }

    #[test]
    fn test_fetch_by_email_missing() {
        // arrange
        let mut records = MockUserRepository::new();
        records.expect_get_user_by_email().returning(|_| Ok(None));
        // act
        let usecase = FetchUser::new(Arc::new(records));
        let result = usecase.call(Params::ByEmail(" nobody@example.com ".into()));

        // assert
        assert_eq!(
            result.unwrap_err().to_string(),
            "no user with email nobody@example.com"
        );
    }
}
