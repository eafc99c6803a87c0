use teloxide::types::{KeyboardButton, KeyboardMarkup};

use super::entity::Label;

pub const PER_ROW: usize = 2;
const ADMIN_PER_ROW: usize = 3;

pub fn make_keyboard<I, S>(labels: I, per_row: usize) -> KeyboardMarkup
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let buttons: Vec<KeyboardButton> = labels.into_iter().map(KeyboardButton::new).collect();
    let rows: Vec<Vec<KeyboardButton>> = buttons.chunks(per_row.max(1)).map(|row| row.to_vec()).collect();
    KeyboardMarkup::new(rows).resize_keyboard(true)
}

fn labels(labels: &[Label]) -> impl Iterator<Item = &'static str> + '_ {
    labels.iter().map(|l| l.text())
}

pub fn main_menu(is_admin: bool) -> KeyboardMarkup {
    use Label::*;
    let mut items = vec![GetNumber, SubmitFile, FakeName, Get2fa, Info, Support];
    if is_admin {
        items.extend([AdminPanel, Broadcast]);
    }
    make_keyboard(labels(&items), PER_ROW)
}

pub fn admin_panel() -> KeyboardMarkup {
    use Label::*;
    let items = [
        AddButton, RemoveButton, UploadFile, AddFileName, RemoveFileName, SetTime, UserList, SetOtpLink,
        OffOtpLink, BackToMain,
    ];
    make_keyboard(labels(&items), ADMIN_PER_ROW)
}

/// Dynamic names followed by a back button.
pub fn with_back<I, S>(names: I, back: Label) -> KeyboardMarkup
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let items = names.into_iter().map(Into::<String>::into).chain([back.text().to_owned()]);
    make_keyboard(items, PER_ROW)
}

pub fn back_to_main() -> KeyboardMarkup {
    make_keyboard(labels(&[Label::BackToMain]), PER_ROW)
}

pub fn cancel() -> KeyboardMarkup {
    make_keyboard(labels(&[Label::BackToPanel]), 1)
}

pub fn add_kind() -> KeyboardMarkup {
    make_keyboard(labels(&[Label::AddMain, Label::AddSub, Label::BackToPanel]), PER_ROW)
}

pub fn remove_kind() -> KeyboardMarkup {
    make_keyboard(labels(&[Label::RemoveMain, Label::RemoveSub, Label::BackToPanel]), PER_ROW)
}

pub fn gender() -> KeyboardMarkup {
    make_keyboard(labels(&[Label::Male, Label::Female, Label::BackToMain]), PER_ROW)
}

pub fn totp(has_saved: bool) -> KeyboardMarkup {
    if has_saved {
        make_keyboard(labels(&[Label::UseSavedKey, Label::EnterNewKey, Label::BackToMain]), PER_ROW)
    } else {
        back_to_main()
    }
}

pub fn user_list(buttons: Vec<String>) -> KeyboardMarkup {
    let items = buttons.into_iter().chain([Label::BackToPanel.text().to_owned()]);
    make_keyboard(items, 1)
}

pub fn user_action() -> KeyboardMarkup {
    make_keyboard(labels(&[Label::BlockUser, Label::UnblockUser, Label::BackToPanel]), PER_ROW)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(markup: &KeyboardMarkup) -> Vec<Vec<String>> {
        markup.keyboard.iter().map(|row| row.iter().map(|b| b.text.clone()).collect()).collect()
    }

    #[test]
    fn rows_are_filled_left_to_right() {
        let markup = make_keyboard(["a", "b", "c"], 2);
        assert_eq!(texts(&markup), vec![vec!["a".to_owned(), "b".to_owned()], vec!["c".to_owned()]]);
    }

    #[test]
    fn admins_get_two_more_buttons() {
        let user = texts(&main_menu(false));
        let admin = texts(&main_menu(true));
        assert_eq!(user.len(), 3);
        assert_eq!(admin.len(), 4);
        assert_eq!(admin[3], vec!["⚙️ Admin Panel".to_owned(), "📢 Broadcast".to_owned()]);
    }

    #[test]
    fn admin_panel_has_three_per_row() {
        let panel = texts(&admin_panel());
        assert_eq!(panel.len(), 4);
        assert_eq!(panel[0].len(), 3);
        assert_eq!(panel[3], vec!["⬅️ Back to Main Menu".to_owned()]);
    }

    #[test]
    fn dynamic_lists_end_with_back() {
        let markup = with_back(vec!["OTT".to_owned(), "Mail".to_owned()], Label::BackToMain);
        assert_eq!(texts(&markup), vec![vec!["OTT".to_owned(), "Mail".to_owned()], vec!["⬅️ Back to Main Menu".to_owned()]]);

        let users = texts(&user_list(vec!["👤 A (ID: 1)".into(), "👤 B (ID: 2)".into()]));
        assert_eq!(users.len(), 3);
        assert!(users.iter().all(|row| row.len() == 1));
    }
}
