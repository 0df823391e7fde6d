use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use regex::Regex;

use crate::contacts::NewContact;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]{2,}$").unwrap());

// Letters, with single spaces, hyphens or apostrophes between the words.
static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{L}+(?:[ '\-]\p{L}+)*$").unwrap());

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 /()\-]{2,}$").unwrap());

static UPPER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]").unwrap());
static LOWER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z]").unwrap());
static DIGIT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]").unwrap());
static SPECIAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9\s]").unwrap());

pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Strict `YYYY-MM-DD`: chrono alone would also take `2030-1-5`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.len() != 10 {
        bail!("invalid date '{s}': expected YYYY-MM-DD");
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .with_context(|| format!("invalid date '{s}': expected YYYY-MM-DD"))
}

/// True if `date` is today or later. Unparseable dates are never accepted.
pub fn is_not_past(date: &str, today: NaiveDate) -> bool {
    parse_date(date).is_ok_and(|d| d >= today)
}

pub fn validate_email(email: &str) -> Result<()> {
    if !EMAIL_REGEX.is_match(email.trim()) {
        bail!("'{email}' is not a valid email address");
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<()> {
    if is_blank(name) {
        bail!("name must not be empty");
    }
    if !NAME_REGEX.is_match(name.trim()) {
        bail!("name '{name}' may only contain letters, spaces, hyphens and apostrophes");
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<()> {
    if !PHONE_REGEX.is_match(phone.trim()) {
        bail!("'{phone}' is not a valid phone number");
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("password must be at least {MIN_PASSWORD_LEN} characters");
    }
    let classes: [(&Regex, &str); 4] = [
        (&*UPPER_REGEX, "an upper-case letter"),
        (&*LOWER_REGEX, "a lower-case letter"),
        (&*DIGIT_REGEX, "a digit"),
        (&*SPECIAL_REGEX, "a special character"),
    ];
    for (re, what) in classes {
        if !re.is_match(password) {
            bail!("password must contain {what}");
        }
    }
    Ok(())
}

/// Field flags for the sign-up form; `true` marks an invalid field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignupErrors {
    pub name: bool,
    pub email: bool,
    pub password: bool,
    pub confirm: bool,
    pub policy: bool,
}

impl SignupErrors {
    pub fn is_ok(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
    pub accepted_policy: bool,
}

pub fn check_signup(input: &SignupInput) -> SignupErrors {
    SignupErrors {
        name: validate_name(&input.name).is_err(),
        email: validate_email(&input.email).is_err(),
        password: validate_password(&input.password).is_err(),
        confirm: input.password != input.confirm,
        policy: !input.accepted_policy,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginErrors {
    pub email: bool,
    pub password: bool,
}

/// Login only requires both fields to be filled in.
pub fn check_login(email: &str, password: &str) -> LoginErrors {
    LoginErrors {
        email: email.is_empty(),
        password: password.is_empty(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactErrors {
    pub name: bool,
    pub email: bool,
    pub phone: bool,
}

impl ContactErrors {
    pub fn is_ok(&self) -> bool {
        *self == Self::default()
    }
}

/// Name and email are required; phone is checked only when given.
pub fn check_contact(contact: &NewContact) -> ContactErrors {
    ContactErrors {
        name: validate_name(&contact.name).is_err(),
        email: validate_email(&contact.email).is_err(),
        phone: !is_blank(&contact.phone) && validate_phone(&contact.phone).is_err(),
    }
}
