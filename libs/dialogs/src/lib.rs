//! Dialog that forwards a conversation to a remote skill.
//!
//! [`SkillDialog`] sits on a conversation's dialog stack and relays every
//! turn to the skill it is bound to. Replies buffered by the skill
//! (`expectReplies` delivery) are relayed to the user, OAuth sign-in cards are
//! answered with a silently exchanged token when the channel supports it, and
//! an `endOfConversation` from the skill completes the dialog.
pub mod dialog;
pub mod error;
mod intercept;
mod invoke;
pub mod options;
pub mod skill_dialog;

pub use dialog::{Dialog, DialogContext, DialogReason, DialogTurnResult, DialogTurnStatus};
pub use error::DialogError;
pub use options::{BeginSkillDialogOptions, SkillDialogOptions};
pub use skill_dialog::{REPROMPT_DIALOG_EVENT, SkillDialog};
