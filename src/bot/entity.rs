use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use teloxide::dispatching::dialogue::GetChatId;
use teloxide::types::{ChatId, Document, Message, MessageKind, Update, UpdateKind, User, UserId};

/// Fixed reply keyboard labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::EnumString, strum_macros::IntoStaticStr, strum_macros::EnumIter)]
pub enum Label {
    #[strum(serialize = "🔢 Get Number")]
    GetNumber,
    #[strum(serialize = "✍️ Submit File")]
    SubmitFile,
    #[strum(serialize = "🎭 Fake Name")]
    FakeName,
    #[strum(serialize = "📲 Get 2FA")]
    Get2fa,
    #[strum(serialize = "ℹ️ Info")]
    Info,
    #[strum(serialize = "🆘 Support")]
    Support,
    #[strum(serialize = "⚙️ Admin Panel")]
    AdminPanel,
    #[strum(serialize = "📢 Broadcast")]
    Broadcast,
    #[strum(serialize = "➕ Add Button")]
    AddButton,
    #[strum(serialize = "🗑️ Remove Button")]
    RemoveButton,
    #[strum(serialize = "📤 Upload File")]
    UploadFile,
    #[strum(serialize = "✍️ Add File Name")]
    AddFileName,
    #[strum(serialize = "❌ Remove File Name")]
    RemoveFileName,
    #[strum(serialize = "⏰ Set time (Bangladesh)")]
    SetTime,
    #[strum(serialize = "👥 User List")]
    UserList,
    #[strum(serialize = "🔗 Set OTP Group Link")]
    SetOtpLink,
    #[strum(serialize = "🚫 Off OTP Group Link")]
    OffOtpLink,
    #[strum(serialize = "⬅️ Back to Main Menu")]
    BackToMain,
    #[strum(serialize = "↩️ Back to Admin Panel")]
    BackToPanel,
    #[strum(serialize = "1️⃣ Add Main Button")]
    AddMain,
    #[strum(serialize = "2️⃣ Add Sub Button")]
    AddSub,
    #[strum(serialize = "1️⃣ Remove Main Button")]
    RemoveMain,
    #[strum(serialize = "2️⃣ Remove Sub Button")]
    RemoveSub,
    #[strum(serialize = "👨 Male")]
    Male,
    #[strum(serialize = "👩 Female")]
    Female,
    #[strum(serialize = "🚫 Block User")]
    BlockUser,
    #[strum(serialize = "✅ Unblock User")]
    UnblockUser,
    #[strum(serialize = "Use saved key")]
    UseSavedKey,
    #[strum(serialize = "Enter new key")]
    EnterNewKey,
}

impl Label {
    pub fn text(self) -> &'static str {
        self.into()
    }
    /// Labels of the main menu and the admin panel that only admins may use.
    pub fn is_admin_only(self) -> bool {
        matches!(
            self,
            Label::AdminPanel
                | Label::Broadcast
                | Label::AddButton
                | Label::RemoveButton
                | Label::UploadFile
                | Label::AddFileName
                | Label::RemoveFileName
                | Label::SetTime
                | Label::UserList
                | Label::SetOtpLink
                | Label::OffOtpLink
        )
    }
}

/// Plain text sent by the user, never a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Text(pub String);

impl Text {
    pub fn label(&self) -> Option<Label> {
        Label::from_str(&self.0).ok()
    }
    pub fn is(&self, label: Label) -> bool {
        self.0 == label.text()
    }
}

#[derive(Clone, Debug)]
pub enum SignalKind {
    Start,
    Text(Text),
    Document(Document),
}

#[derive(Clone, Debug)]
pub struct Signal {
    chat_id: ChatId,
    user: User,
    kind: SignalKind,
}

impl Signal {
    pub fn from_update(u: Update) -> Option<Self> {
        match u.kind {
            UpdateKind::Message(msg) => Self::from_message(msg),
            UpdateKind::Error(e) => {
                log::error!("Received error: {:?}", e);
                None
            }
            _ => None,
        }
    }
    fn from_message(msg: Message) -> Option<Self> {
        if !msg.chat.is_private() {
            return None;
        }
        let chat_id = msg.chat.id;
        let user = match &msg.kind {
            MessageKind::Common(common) => common.from.clone()?,
            _ => return None,
        };
        let kind = match msg.document() {
            Some(document) => SignalKind::Document(document.clone()),
            None => text_to_kind(msg.text()?)?,
        };
        Some(Signal { chat_id, user, kind })
    }
    pub fn filter_text(self) -> Option<Text> {
        match self.kind {
            SignalKind::Text(text) => Some(text),
            _ => None,
        }
    }
    pub fn filter_document(self) -> Option<Document> {
        match self.kind {
            SignalKind::Document(document) => Some(document),
            _ => None,
        }
    }
    pub fn is_start(&self) -> bool {
        matches!(self.kind, SignalKind::Start)
    }
    pub fn user(&self) -> &User {
        &self.user
    }
    pub fn user_id(&self) -> UserId {
        self.user.id
    }
}

impl GetChatId for Signal {
    fn chat_id(&self) -> Option<ChatId> {
        Some(self.chat_id)
    }
}

/// `/start` (also `/start@bot payload`) becomes `Start`, other commands are dropped.
fn text_to_kind(text: &str) -> Option<SignalKind> {
    let Some(command) = text.strip_prefix('/') else {
        return Some(SignalKind::Text(Text(text.to_owned())));
    };
    let name = command.split_whitespace().next()?.split('@').next()?;
    (name == "start").then_some(SignalKind::Start)
}

lazy_static! {
    /// The id is the last `(ID: n)` of the button, first names may contain the same text.
    static ref USER_BUTTON_ID: Option<Regex> = Regex::new(r"\(ID:\s*(\d+)\)(?: \(🚫 Blocked\))?$").ok();
}

/// Button text for the user list, `👤 Rafi (ID: 42)`.
pub fn user_button(user_id: UserId, first_name: &str, blocked: bool) -> String {
    let status = if blocked { " (🚫 Blocked)" } else { "" };
    format!("👤 {} (ID: {}){}", first_name, user_id.0, status)
}

/// Reads the id back from a user list button.
pub fn parse_user_button(text: &str) -> Option<UserId> {
    let caps = USER_BUTTON_ID.as_ref()?.captures(text)?;
    caps[1].parse().ok().map(UserId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn labels_round_trip_through_their_text() {
        for label in Label::iter() {
            assert_eq!(Text(label.text().to_owned()).label(), Some(label));
        }
        assert_eq!(Text("Netflix".into()).label(), None);
    }

    #[test]
    fn admin_only_labels() {
        assert!(Label::Broadcast.is_admin_only());
        assert!(Label::SetTime.is_admin_only());
        assert!(!Label::GetNumber.is_admin_only());
        assert!(!Label::BackToMain.is_admin_only());
    }

    #[test]
    fn commands() {
        assert!(matches!(text_to_kind("/start"), Some(SignalKind::Start)));
        assert!(matches!(text_to_kind("/start@numbers_bot ref42"), Some(SignalKind::Start)));
        assert!(text_to_kind("/help").is_none());
        assert!(matches!(text_to_kind("hello"), Some(SignalKind::Text(Text(t))) if t == "hello"));
    }

    #[test]
    fn user_buttons() {
        let button = user_button(UserId(42), "Rafi (test)", true);
        assert_eq!(button, "👤 Rafi (test) (ID: 42) (🚫 Blocked)");
        assert_eq!(parse_user_button(&button), Some(UserId(42)));
        assert_eq!(parse_user_button("👤 Rafi (ID:7)"), Some(UserId(7)));
        assert_eq!(parse_user_button("👤 Rafi"), None);

        // a first name that looks like an id must not win over the real one
        let button = user_button(UserId(42), "Bob (ID: 1)", false);
        assert_eq!(button, "👤 Bob (ID: 1) (ID: 42)");
        assert_eq!(parse_user_button(&button), Some(UserId(42)));
        let blocked = user_button(UserId(42), "Bob (ID: 1)", true);
        assert_eq!(parse_user_button(&blocked), Some(UserId(42)));
    }
}
