use thiserror::Error;

/// Rejected input. Nothing is written when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a group name")]
    MissingGroupName,

    #[error("Please add at least two participants")]
    TooFewParticipants,

    #[error("Participant name cannot be empty")]
    EmptyParticipantName,

    #[error("Participant '{0}' is listed more than once")]
    DuplicateParticipant(String),

    #[error("Active user '{0}' is not a participant of the group")]
    UnknownActiveUser(String),

    #[error("Please enter a title for the expense")]
    MissingTitle,

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Please select who paid for the expense")]
    MissingPayer,

    #[error("Payer '{0}' is not a participant of the group")]
    UnknownPayer(String),

    #[error("Please select at least one person who shared this expense")]
    NoSharers,

    #[error("'{0}' is not a participant of the group")]
    UnknownSharer(String),

    #[error("'{0}' is selected more than once")]
    DuplicateSharer(String),
}
