use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9+._%\-]{1,256}@[a-zA-Z0-9][a-zA-Z0-9\-]{0,64}(\.[a-zA-Z0-9][a-zA-Z0-9\-]{0,25})+$",
    )
    .expect("email regex should compile")
});

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("The email can't be blank")]
    BlankEmail,
    #[error("That's not a valid email")]
    InvalidEmail,
    #[error("The password needs to consist of at least 8 characters")]
    PasswordTooShort,
    #[error("The password needs to contain at least one letter and digit")]
    PasswordTooWeak,
    #[error("The passwords don't match")]
    PasswordMismatch,
}

pub fn validate_email(input: &str) -> Result<(), ValidationError> {
    if input.trim().is_empty() {
        return Err(ValidationError::BlankEmail);
    }
    if !EMAIL_PATTERN.is_match(input) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn validate_password(input: &str) -> Result<(), ValidationError> {
    if input.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    let has_digit = input.chars().any(|c| c.is_ascii_digit());
    let has_letter = input.chars().any(char::is_alphabetic);
    if !(has_digit && has_letter) {
        return Err(ValidationError::PasswordTooWeak);
    }
    Ok(())
}

pub fn validate_confirm_password(input: &str, password: &str) -> Result<(), ValidationError> {
    if input != password {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

fn message(result: Result<(), ValidationError>) -> Option<String> {
    result.err().map(|e| e.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignInEvent {
    EmailChanged(String),
    PasswordChanged(String),
    Submit,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SignInForm {
    pub email: String,
    pub email_error: Option<String>,
    #[serde(skip)]
    pub password: String,
    pub password_error: Option<String>,
}

impl SignInForm {
    /// Returns true only for a `Submit` whose fields all validate.
    pub fn on_event(&mut self, event: SignInEvent) -> bool {
        match event {
            SignInEvent::EmailChanged(email) => {
                self.email = email;
                self.check_email();
                false
            },
            SignInEvent::PasswordChanged(password) => {
                self.password = password;
                self.check_password();
                false
            },
            SignInEvent::Submit => {
                let email_ok = self.check_email();
                let password_ok = self.check_password();
                email_ok && password_ok
            },
        }
    }

    fn check_email(&mut self) -> bool {
        self.email_error = message(validate_email(&self.email));
        self.email_error.is_none()
    }

    fn check_password(&mut self) -> bool {
        self.password_error = message(validate_password(&self.password));
        self.password_error.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignUpEvent {
    EmailChanged(String),
    PasswordChanged(String),
    ConfirmPasswordChanged(String),
    Submit,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SignUpForm {
    pub email: String,
    pub email_error: Option<String>,
    #[serde(skip)]
    pub password: String,
    pub password_error: Option<String>,
    #[serde(skip)]
    pub confirm_password: String,
    pub confirm_password_error: Option<String>,
}

impl SignUpForm {
    pub fn on_event(&mut self, event: SignUpEvent) -> bool {
        match event {
            SignUpEvent::EmailChanged(email) => {
                self.email = email;
                self.check_email();
                false
            },
            SignUpEvent::PasswordChanged(password) => {
                self.password = password;
                self.check_password();
                false
            },
            SignUpEvent::ConfirmPasswordChanged(confirm) => {
                self.confirm_password = confirm;
                self.check_confirm_password();
                false
            },
            SignUpEvent::Submit => {
                let email_ok = self.check_email();
                let password_ok = self.check_password();
                let confirm_ok = self.check_confirm_password();
                email_ok && password_ok && confirm_ok
            },
        }
    }

    fn check_email(&mut self) -> bool {
        self.email_error = message(validate_email(&self.email));
        self.email_error.is_none()
    }

    fn check_password(&mut self) -> bool {
        self.password_error = message(validate_password(&self.password));
        self.password_error.is_none()
    }

    fn check_confirm_password(&mut self) -> bool {
        self.confirm_password_error =
            message(validate_confirm_password(&self.confirm_password, &self.password));
        self.confirm_password_error.is_none()
    }
}
