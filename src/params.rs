//! Submitted wizard parameters
//!
//! Parameters arrive as flat form pairs using the nested key convention
//! (`petition[action]`, `petition[creator_signature][email]`). Only the
//! fields below are permitted; anything else, `state` included, is dropped
//! during parsing so it can never reach a record.
use serde::Serialize;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PetitionParams {
    pub action: String,
    pub background: String,
    pub additional_details: String,
    pub creator_signature: SignatureParams,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureParams {
    pub name: String,
    pub email: String,
    pub postcode: String,
    pub country: String,
    pub uk_citizenship: String,
}

impl SignatureParams {
    pub fn uk_citizenship_accepted(&self) -> bool {
        self.uk_citizenship.trim() == "1"
    }
}

/// A whole wizard submission: stage, navigation signals and fields.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StageSubmission {
    pub stage: Option<String>,
    pub move_to: Option<String>,
    pub move_next: bool,
    pub move_back: bool,
    pub petition: PetitionParams,
}

impl StageSubmission {
    pub fn from_form_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut submission = StageSubmission::default();
        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref() {
                "stage" => submission.stage = Some(value),
                "move" => submission.move_to = Some(value),
                "move:next" => submission.move_next = true,
                "move:back" => submission.move_back = true,
                key => {
                    if let Some(field) = petition_field(&mut submission.petition, key) {
                        *field = value;
                    }
                }
            }
        }
        submission
    }
}

fn petition_field<'a>(params: &'a mut PetitionParams, key: &str) -> Option<&'a mut String> {
    let path = key.strip_prefix("petition[")?;
    if let Some(path) = path.strip_prefix("creator_signature][") {
        let signer = &mut params.creator_signature;
        return match path.strip_suffix(']')? {
            "name" => Some(&mut signer.name),
            "email" => Some(&mut signer.email),
            "postcode" => Some(&mut signer.postcode),
            "country" => Some(&mut signer.country),
            "uk_citizenship" => Some(&mut signer.uk_citizenship),
            _ => None,
        };
    }
    match path.strip_suffix(']')? {
        "action" => Some(&mut params.action),
        "background" => Some(&mut params.background),
        "additional_details" => Some(&mut params.additional_details),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_keys() {
        let submission = StageSubmission::from_form_pairs([
            ("stage", "creator"),
            ("move", "next"),
            ("petition[action]", "Save the planet"),
            ("petition[creator_signature][email]", "john@example.com"),
            ("petition[creator_signature][uk_citizenship]", "1"),
        ]);

        assert_eq!(submission.stage.as_deref(), Some("creator"));
        assert_eq!(submission.move_to.as_deref(), Some("next"));
        assert_eq!(submission.petition.action, "Save the planet");
        assert_eq!(submission.petition.creator_signature.email, "john@example.com");
        assert!(submission.petition.creator_signature.uk_citizenship_accepted());
    }

    #[test]
    fn drops_unpermitted_keys() {
        let submission = StageSubmission::from_form_pairs([
            ("petition[state]", "validated"),
            ("petition[creator_signature][state]", "validated"),
            ("petition[creator_signature]", "oops"),
            ("petition[action", "unterminated"),
        ]);

        assert_eq!(submission.petition, PetitionParams::default());
    }

    #[test]
    fn records_companion_move_signals() {
        let submission =
            StageSubmission::from_form_pairs([("move:next", "Onwards!"), ("move:back", "Backwards!")]);

        assert!(submission.move_next);
        assert!(submission.move_back);
        assert_eq!(submission.move_to, None);
    }
}
