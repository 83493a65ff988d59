//! Two-step account registration: submit the form, then confirm with a six-digit code.

use chrono::{Datelike, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::aggregates::{AddressForm, Gender, Profile, User};
use crate::shop::Shop;
use crate::store::keys;
use crate::{Result, ShopError};

const MINIMUM_AGE: i32 = 18;

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_registration", skip_on_field_errors = false))]
pub struct RegistrationForm {
    #[validate(length(min = 3, message = "Full name must be at least 3 characters"))]
    pub full_name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Please enter a valid mobile number"))]
    pub mobile: String,
    pub gender: Gender,
    #[validate(length(min = 1, message = "Please select your country"))]
    pub country: String,
    #[validate(length(min = 1, message = "Please enter your city"))]
    pub city: String,
    #[validate(length(min = 5, message = "Address must be at least 5 characters"))]
    pub address: String,
    #[validate(length(min = 4, message = "Please enter a valid postal code"))]
    pub postal_code: String,
    pub birth_date: NaiveDate,
    #[validate(custom = "validate_password_strength")]
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub accept_terms: bool,
    #[serde(default)]
    pub receive_newsletters: bool,
    #[validate(length(min = 1, message = "Please select a security question"))]
    pub security_question: String,
    #[validate(length(min = 1, message = "Please provide an answer to the security question"))]
    pub security_answer: String,
    pub profile_picture: Option<String>,
}

/// The form as kept while the code is outstanding. Secrets are not persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRegistration {
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    pub gender: Gender,
    pub country: String,
    pub city: String,
    pub address: String,
    pub postal_code: String,
    pub birth_date: NaiveDate,
    pub receive_newsletters: bool,
    pub profile_picture: Option<String>,
}

/// What step one hands back, including the code itself.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationChallenge { pub email: String, pub code: String }

fn validate_password_strength(password: &str) -> std::result::Result<(), ValidationError> {
    let long_enough = password.chars().count() >= 8;
    let upper = password.chars().any(|c| c.is_uppercase());
    let lower = password.chars().any(|c| c.is_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let special = password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace());
    if long_enough && upper && lower && digit && special { Ok(()) } else { Err(ValidationError::new("weak_password")) }
}

fn validate_registration(form: &RegistrationForm) -> std::result::Result<(), ValidationError> {
    if form.password != form.confirm_password { return Err(ValidationError::new("passwords_do_not_match")); }
    if !form.accept_terms { return Err(ValidationError::new("terms_not_accepted")); }
    if age_on(form.birth_date, Utc::now().date_naive()) < MINIMUM_AGE { return Err(ValidationError::new("must_be_adult")); }
    Ok(())
}

/// Whole years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) { age -= 1; }
    age
}

fn generate_code() -> String { rand::thread_rng().gen_range(100_000..1_000_000).to_string() }

impl From<RegistrationForm> for PendingRegistration {
    fn from(f: RegistrationForm) -> Self {
        Self {
            full_name: f.full_name.trim().to_string(), email: f.email.trim().to_lowercase(), mobile: f.mobile, gender: f.gender,
            country: f.country, city: f.city, address: f.address, postal_code: f.postal_code, birth_date: f.birth_date,
            receive_newsletters: f.receive_newsletters, profile_picture: f.profile_picture,
        }
    }
}

impl Shop {
    /// Step one: validate, stash the form and issue a verification code.
    pub fn start_registration(&mut self, form: RegistrationForm) -> Result<VerificationChallenge> {
        form.validate()?;
        let pending = PendingRegistration::from(form);
        if self.find_user_by_email(&pending.email).is_some() {
            return Err(ShopError::Conflict(format!("an account with email {} already exists", pending.email)));
        }
        let code = generate_code();
        self.storage.save_value(keys::REGISTRATION_FORM_DATA, &pending)?;
        self.storage.save_value(keys::VERIFICATION_CODE, &code)?;
        self.storage.save_value(keys::VERIFICATION_EMAIL, &pending.email)?;
        tracing::info!(email = %pending.email, "registration started, verification code issued");
        Ok(VerificationChallenge { email: pending.email, code })
    }

    /// Issues a fresh code for the registration awaiting verification.
    pub fn resend_verification_code(&mut self, email: &str) -> Result<VerificationChallenge> {
        let pending = self.pending_registration(email)?;
        let code = generate_code();
        self.storage.save_value(keys::VERIFICATION_CODE, &code)?;
        tracing::info!(email = %pending.email, "verification code reissued");
        Ok(VerificationChallenge { email: pending.email, code })
    }

    /// Step two: check the code, create the account and clear the scratch keys.
    pub fn verify_registration(&mut self, email: &str, code: &str) -> Result<User> {
        let pending = self.pending_registration(email)?;
        let expected: Option<String> = self.storage.load_value(keys::VERIFICATION_CODE);
        if expected.as_deref() != Some(code.trim()) { return Err(ShopError::InvalidVerificationCode); }

        let profile = Profile {
            gender: Some(pending.gender), country: Some(pending.country), city: Some(pending.city.clone()),
            birth_date: Some(pending.birth_date), receive_newsletters: pending.receive_newsletters, profile_picture: pending.profile_picture,
        };
        let mut user = User::new(pending.full_name, &pending.email, Some(pending.mobile), &self.currency).with_profile(profile);
        user.add_address(AddressForm {
            name: "Home".into(), address: pending.address, state: pending.city.clone(), city: pending.city, postal_code: pending.postal_code, is_default: true,
        })?;
        let user = self.add_user(user)?;

        for key in [keys::REGISTRATION_FORM_DATA, keys::VERIFICATION_CODE, keys::VERIFICATION_EMAIL] { self.storage.remove(key)?; }
        tracing::info!(user_id = user.id(), "registration verified");
        Ok(user)
    }

    fn pending_registration(&self, email: &str) -> Result<PendingRegistration> {
        let awaiting: Option<String> = self.storage.load_value(keys::VERIFICATION_EMAIL);
        let pending: Option<PendingRegistration> = self.storage.load_value(keys::REGISTRATION_FORM_DATA);
        match (awaiting, pending) {
            (Some(awaiting), Some(pending)) if awaiting.eq_ignore_ascii_case(email.trim()) => Ok(pending),
            _ => Err(ShopError::NoPendingRegistration(email.trim().to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_form(email: &str) -> RegistrationForm {
    RegistrationForm {
        full_name: "Sara Mahmoud".into(), email: email.into(), mobile: "01012345678".into(), gender: Gender::Female,
        country: "Egypt".into(), city: "Cairo".into(), address: "15 Tahrir Square".into(), postal_code: "11511".into(),
        birth_date: NaiveDate::from_ymd_opt(1995, 6, 1).unwrap(), password: "Str0ng!pass".into(), confirm_password: "Str0ng!pass".into(),
        accept_terms: true, receive_newsletters: true, security_question: "pet".into(), security_answer: "Mishmish".into(), profile_picture: None,
    }
}
