use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Currency, ValidationError};

pub type ParticipantId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
}

/// The people sharing one expense ledger, plus the group's settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub group_name: String,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_details: Option<String>,
    pub participants: Vec<Participant>,
    /// Name of the participant using this ledger ("You are ...")
    pub active_user: String,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Create a group from participant names.
    ///
    /// Names are trimmed and blank entries dropped before validation. The
    /// first remaining participant becomes the active user.
    pub fn new<I, S>(group_name: &str, currency: Currency, names: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let group_name = group_name.trim();
        if group_name.is_empty() {
            return Err(ValidationError::MissingGroupName);
        }

        let names: Vec<String> = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        if names.len() < 2 {
            return Err(ValidationError::TooFewParticipants);
        }

        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(ValidationError::DuplicateParticipant(name.clone()));
            }
        }

        let active_user = names[0].clone();
        let participants = names
            .into_iter()
            .zip(1..)
            .map(|(name, id)| Participant { id, name })
            .collect();

        Ok(Self {
            group_name: group_name.to_string(),
            currency,
            group_details: None,
            participants,
            active_user,
            created_at: Utc::now(),
        })
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        self.group_details = if details.trim().is_empty() {
            None
        } else {
            Some(details)
        };
        self
    }

    pub fn with_active_user(mut self, name: &str) -> Result<Self, ValidationError> {
        self.set_active_user(name)?;
        Ok(self)
    }

    pub fn set_active_user(&mut self, name: &str) -> Result<(), ValidationError> {
        let name = name.trim();
        if !self.has_participant(name) {
            return Err(ValidationError::UnknownActiveUser(name.to_string()));
        }
        self.active_user = name.to_string();
        Ok(())
    }

    pub fn participant(&self, name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.name == name)
    }

    pub fn has_participant(&self, name: &str) -> bool {
        self.participant(name).is_some()
    }

    pub fn participant_names(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.name.as_str())
    }

    fn next_participant_id(&self) -> ParticipantId {
        self.participants.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    /// Add a new member to the group.
    pub fn add_participant(&mut self, name: &str) -> Result<&Participant, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyParticipantName);
        }
        if self.has_participant(name) {
            return Err(ValidationError::DuplicateParticipant(name.to_string()));
        }

        let id = self.next_participant_id();
        self.participants.push(Participant {
            id,
            name: name.to_string(),
        });
        Ok(&self.participants[self.participants.len() - 1])
    }

    /// Remove a member by name, returning it if it was present.
    ///
    /// Does not check for expenses referencing the member or for the
    /// two-member minimum; the ledger store guards both. If the active user
    /// leaves, the first remaining member takes over.
    pub fn remove_participant(&mut self, name: &str) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.name == name)?;
        let removed = self.participants.remove(index);
        if self.active_user == removed.name {
            self.active_user = self
                .participants
                .first()
                .map(|p| p.name.clone())
                .unwrap_or_default();
        }
        Some(removed)
    }

    /// Check the invariants of a group created through [`Group::new`].
    /// Used when loading data from outside the store (snapshot import).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.group_name.trim().is_empty() {
            return Err(ValidationError::MissingGroupName);
        }
        if self.participants.len() < 2 {
            return Err(ValidationError::TooFewParticipants);
        }
        let mut seen = HashSet::new();
        for participant in &self.participants {
            if participant.name.trim().is_empty() {
                return Err(ValidationError::EmptyParticipantName);
            }
            if !seen.insert(participant.name.as_str()) {
                return Err(ValidationError::DuplicateParticipant(
                    participant.name.clone(),
                ));
            }
        }
        if !self.has_participant(&self.active_user) {
            return Err(ValidationError::UnknownActiveUser(self.active_user.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip() -> Group {
        Group::new("Trip to Goa", Currency::Inr, ["Asha", "Ben", "Chen"]).unwrap()
    }

    #[test]
    fn test_new_group_assigns_ids_and_active_user() {
        let group = trip();
        assert_eq!(group.group_name, "Trip to Goa");
        assert_eq!(group.active_user, "Asha");
        let ids: Vec<_> = group.participants.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_new_group_drops_blank_names() {
        let group = Group::new(" Flat ", Currency::Usd, ["  Asha ", "", "   ", "Ben"]).unwrap();
        assert_eq!(group.group_name, "Flat");
        let names: Vec<_> = group.participant_names().collect();
        assert_eq!(names, vec!["Asha", "Ben"]);
    }

    #[test]
    fn test_new_group_validation() {
        assert_eq!(
            Group::new("  ", Currency::Inr, ["A", "B"]).unwrap_err(),
            ValidationError::MissingGroupName
        );
        assert_eq!(
            Group::new("Flat", Currency::Inr, ["A", ""]).unwrap_err(),
            ValidationError::TooFewParticipants
        );
        assert_eq!(
            Group::new("Flat", Currency::Inr, ["A", "B", "A"]).unwrap_err(),
            ValidationError::DuplicateParticipant("A".into())
        );
    }

    #[test]
    fn test_active_user_must_be_participant() {
        let group = trip().with_active_user("Ben").unwrap();
        assert_eq!(group.active_user, "Ben");

        let err = trip().with_active_user("Zed").unwrap_err();
        assert_eq!(err, ValidationError::UnknownActiveUser("Zed".into()));
    }

    #[test]
    fn test_details_blank_is_none() {
        assert_eq!(trip().with_details("   ").group_details, None);
        assert_eq!(
            trip().with_details("Beach week").group_details.as_deref(),
            Some("Beach week")
        );
    }

    #[test]
    fn test_add_participant() {
        let mut group = trip();
        let added = group.add_participant(" Dev ").unwrap().clone();
        assert_eq!(added.id, 4);
        assert_eq!(added.name, "Dev");
        assert_eq!(
            group.add_participant("Dev").unwrap_err(),
            ValidationError::DuplicateParticipant("Dev".into())
        );
        assert_eq!(
            group.add_participant(" ").unwrap_err(),
            ValidationError::EmptyParticipantName
        );
    }

    #[test]
    fn test_remove_participant_reassigns_active_user() {
        let mut group = trip();
        let removed = group.remove_participant("Asha").unwrap();
        assert_eq!(removed.name, "Asha");
        assert_eq!(group.active_user, "Ben");
        assert!(group.remove_participant("Asha").is_none());
    }

    #[test]
    fn test_serialized_layout_is_camel_case() {
        let group = trip().with_details("Beach week");
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["groupName"], "Trip to Goa");
        assert_eq!(json["currency"], "INR");
        assert_eq!(json["groupDetails"], "Beach week");
        assert_eq!(json["activeUser"], "Asha");
        assert_eq!(json["participants"][1]["name"], "Ben");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_validate_detects_broken_groups() {
        let mut group = trip();
        assert!(group.validate().is_ok());

        group.active_user = "Nobody".into();
        assert_eq!(
            group.validate().unwrap_err(),
            ValidationError::UnknownActiveUser("Nobody".into())
        );

        let mut group = trip();
        group.participants.truncate(1);
        assert_eq!(
            group.validate().unwrap_err(),
            ValidationError::TooFewParticipants
        );
    }
}
