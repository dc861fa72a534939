//! Field-level validation for petition and creator signature parameters
use crate::params::PetitionParams;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

pub const ACTION_MAX_LENGTH: usize = 80;
pub const BACKGROUND_MAX_LENGTH: usize = 300;
pub const ADDITIONAL_DETAILS_MAX_LENGTH: usize = 800;
pub const NAME_MAX_LENGTH: usize = 255;

pub const UNITED_KINGDOM: &str = "United Kingdom";

/// Email format shared by the wizard and the confirmation dispatcher.
pub static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[^@\s]+@([-a-z0-9]+\.)+[a-z]{2,}$").expect("invalid email pattern")
});

static POSTCODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(GIR0AA|[A-PR-UWYZ][A-HK-Y]?[0-9][0-9A-HJKMNPR-Y]?[0-9][ABD-HJLNP-UW-Z]{2})$")
        .expect("invalid postcode pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Action,
    Background,
    AdditionalDetails,
    Name,
    Email,
    Postcode,
    Country,
    UkCitizenship,
}

impl Field {
    pub const PETITION: [Field; 3] = [Field::Action, Field::Background, Field::AdditionalDetails];
    pub const CREATOR: [Field; 5] = [
        Field::Name,
        Field::Email,
        Field::Postcode,
        Field::Country,
        Field::UkCitizenship,
    ];
    pub const ALL: [Field; 8] = [
        Field::Action,
        Field::Background,
        Field::AdditionalDetails,
        Field::Name,
        Field::Email,
        Field::Postcode,
        Field::Country,
        Field::UkCitizenship,
    ];
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add(&mut self, field: Field, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }
    pub fn get(&self, field: Field) -> &[String] {
        self.0.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }
}

/// Validates `fields` against the trimmed parameter values.
pub fn validate(params: &PetitionParams, fields: &[Field]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for field in fields {
        validate_field(params, *field, &mut errors);
    }
    errors
}

fn validate_field(params: &PetitionParams, field: Field, errors: &mut FieldErrors) {
    let signer = &params.creator_signature;
    match field {
        Field::Action => {
            required(errors, field, &params.action, "Action must be completed");
            too_long(errors, field, &params.action, ACTION_MAX_LENGTH, "Action is too long");
        }
        Field::Background => {
            required(errors, field, &params.background, "Background must be completed");
            too_long(
                errors,
                field,
                &params.background,
                BACKGROUND_MAX_LENGTH,
                "Background is too long",
            );
        }
        Field::AdditionalDetails => too_long(
            errors,
            field,
            &params.additional_details,
            ADDITIONAL_DETAILS_MAX_LENGTH,
            "Additional details is too long",
        ),
        Field::Name => {
            required(errors, field, &signer.name, "Name must be completed");
            too_long(errors, field, &signer.name, NAME_MAX_LENGTH, "Name is too long");
        }
        Field::Email => {
            let email = signer.email.trim();
            if email.is_empty() {
                errors.add(field, "Email must be completed");
            } else if !EMAIL_PATTERN.is_match(email) {
                errors.add(field, "Email not recognised");
            }
        }
        Field::Country => required(errors, field, &signer.country, "Location must be completed"),
        Field::Postcode => {
            if signer.country.trim() != UNITED_KINGDOM {
                return;
            }
            let postcode = sanitize_postcode(&signer.postcode);
            if postcode.is_empty() {
                errors.add(field, "Postcode must be completed");
            } else if !is_valid_postcode(&postcode) {
                errors.add(field, "Postcode not recognised");
            }
        }
        Field::UkCitizenship => {
            if !signer.uk_citizenship_accepted() {
                errors.add(field, "You must be a British citizen or normally live in the UK");
            }
        }
    }
}

fn required(errors: &mut FieldErrors, field: Field, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.add(field, message);
    }
}

fn too_long(errors: &mut FieldErrors, field: Field, value: &str, max: usize, message: &str) {
    if value.trim().chars().count() > max {
        errors.add(field, message);
    }
}

/// Uppercases and removes all whitespace, e.g. `" se3 4ll "` becomes `"SE34LL"`.
pub fn sanitize_postcode(postcode: &str) -> String {
    postcode
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn is_valid_postcode(sanitized: &str) -> bool {
    POSTCODE_PATTERN.is_match(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SignatureParams;

    fn complete_params() -> PetitionParams {
        PetitionParams {
            action: "Save the planet".into(),
            background: "Limit temperature rise at two degrees".into(),
            additional_details: "Global warming is upon us".into(),
            creator_signature: SignatureParams {
                name: "John Mcenroe".into(),
                email: "john@example.com".into(),
                postcode: "SE3 4LL".into(),
                country: UNITED_KINGDOM.into(),
                uk_citizenship: "1".into(),
            },
        }
    }

    #[test]
    fn complete_params_have_no_errors() {
        assert!(validate(&complete_params(), &Field::ALL).is_empty());
    }

    #[test]
    fn email_pattern_rejects_partial_addresses() {
        assert!(EMAIL_PATTERN.is_match("john@example.com"));
        assert!(!EMAIL_PATTERN.is_match("foo@"));
        assert!(!EMAIL_PATTERN.is_match("not much of an email"));
        assert!(!EMAIL_PATTERN.is_match("john@localhost"));
    }

    #[test]
    fn email_domain_needs_labels_and_a_tld() {
        assert!(EMAIL_PATTERN.is_match("John.Mcenroe@Mail.Example.CO.UK"));
        assert!(EMAIL_PATTERN.is_match("a+b@my-host.example.org"));
        for email in ["a@b..c", "a@b.c", "a@b_c!.d", "a@.com", "a@b.c0m"] {
            assert!(!EMAIL_PATTERN.is_match(email), "{email} should be rejected");
        }
    }

    #[test]
    fn email_is_validated_trimmed() {
        let mut params = complete_params();
        params.creator_signature.email = " john@example.com ".into();

        assert!(validate(&params, &[Field::Email]).is_empty());
    }

    #[test]
    fn additional_details_limit_is_800_chars() {
        let mut params = complete_params();
        params.additional_details = "a".repeat(800);
        assert!(validate(&params, &Field::PETITION).is_empty());

        params.additional_details = "a".repeat(801);
        let errors = validate(&params, &Field::PETITION);
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec![Field::AdditionalDetails]);
    }

    #[test]
    fn postcode_only_required_in_the_uk() {
        let mut params = complete_params();
        params.creator_signature.postcode = String::new();
        assert!(!validate(&params, &[Field::Postcode]).is_empty());

        params.creator_signature.country = "France".into();
        assert!(validate(&params, &[Field::Postcode]).is_empty());
    }

    #[test]
    fn sanitizes_postcodes() {
        assert_eq!(sanitize_postcode(" se3 4ll "), "SE34LL");
        assert!(is_valid_postcode("SE34LL"));
        assert!(is_valid_postcode("SW1A1AA"));
        assert!(!is_valid_postcode("12345"));
    }

    #[test]
    fn citizenship_must_be_accepted() {
        let mut params = complete_params();
        for value in ["0", "", "yes"] {
            params.creator_signature.uk_citizenship = value.into();
            assert_eq!(
                validate(&params, &[Field::UkCitizenship]).fields().collect::<Vec<_>>(),
                vec![Field::UkCitizenship]
            );
        }
    }
}
