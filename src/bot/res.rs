//! Reply texts, already formatted as MarkdownV2.

use teloxide::utils::markdown::{code_inline, escape, link};
use teloxide::types::User;

use crate::fakename::Identity;

pub const BLOCKED: &str = r"*You have been blocked from using this bot\.*";
pub const UNBLOCKED: &str = r"*You have been unblocked and can now use the bot again\.*";
pub const MAIN_MENU: &str = "*Please choose an option from the main menu:*";
pub const ADMIN_PANEL: &str = "*⚙️ Admin Panel:*";
pub const SOMETHING_WRONG: &str = r"*An error occurred\. Please try again later\.*";

// numbers
pub const NO_CATEGORIES: &str = r"*Sorry, no number categories are available right now\.*";
pub const CHOOSE_CATEGORY: &str = "*Please choose a category to get a number:*";
pub const INVALID_CATEGORY: &str = r"*Invalid category\. Please select from the menu\.*";
pub const EMPTY_CATEGORY: &str = r"*Sorry, no numbers are available in this sub\-category yet\.*";
pub const NOT_UPLOADED: &str = r"*Sorry, the numbers for this category have not been uploaded yet\.*";
pub const ALL_DISTRIBUTED: &str = r"*Sorry, all numbers for this category have been distributed\.*";

// submissions
pub const NO_SUBMISSION_CATEGORIES: &str = r"*Sorry, no file submission categories are available right now\.*";
pub const CHOOSE_SUBMISSION: &str = "*Please choose a category to submit your file:*";
pub const INVALID_SUBMISSION: &str = r"*Invalid category selection\.*";
pub const UPLOAD_XLSX: &str = r"*Please upload an \.xlsx file or use the 'Back' button\.*";
pub const UPLOAD_TXT: &str = r"*Please upload a \.txt file or use the 'Back' button\.*";
pub const NOT_XLSX: &str = r"*Invalid file type\. Please upload an \.xlsx file\.*";
pub const NOT_TXT: &str = r"*Invalid file type\. Please upload a \.txt file\.*";
pub const UNEXPECTED_FILE_ADMIN: &str = r"*I'm not expecting a file right now\. Please use the menu buttons\.*";
pub const UNEXPECTED_FILE: &str =
    r"*You are not authorized to perform this action or the bot is not expecting a file\.*";

// fake name
pub const CHOOSE_GENDER: &str = "*Please select a gender for the fake name:*";
pub const INVALID_CHOICE: &str = r"*Invalid choice\. Please try again\.*";

// 2fa
pub const TOTP_SAVED: &str = concat!(
    r"*📲 2FA Code Generator*",
    "\n\n",
    r"You have a saved 2FA secret key\. Would you like to\:",
    "\n",
    r"1\. Use the saved key",
    "\n",
    r"2\. Enter a new key",
    "\n\n",
    r"Or send your new 2FA secret key now \(e\.g\., BK5V TVQ7 D2RB\.\.\.\)",
);
pub const TOTP_NEW: &str = concat!(
    r"*📲 2FA Code Generator*",
    "\n\n",
    r"Please enter your 2FA secret key \(e\.g\., BK5V TVQ7 D2RB\.\.\.\)",
    "\n\n",
    r"*Note\:* This key will be saved for future use unless you choose to remove it\.",
);
pub const TOTP_NO_SAVED: &str = r"*No saved 2FA key found\. Please enter a new one\.*";
pub const TOTP_ENTER_NEW: &str = r"*Please enter your new 2FA secret key \(e\.g\., BK5V TVQ7 D2RB\.\.\.\)\:*";
pub const TOTP_INVALID: &str =
    r"*Invalid 2FA secret key format\. Please enter a valid key \(e\.g\., BK5V TVQ7 D2RB\.\.\.\)*";
pub const TOTP_ERROR: &str = r"*Error generating 2FA code\. Please check your secret key and try again\.*";

// admin
pub const SEND_BROADCAST: &str = r"*Please send the message you want to broadcast to all users, or go back\.*";
pub const CHOOSE_ADD_KIND: &str = "*Select the type of button you want to add:*";
pub const CHOOSE_REMOVE_KIND: &str = "*Select the type of button you want to remove:*";
pub const NO_BUTTONS: &str = r"*There are no buttons to remove\.*";
pub const SEND_MAIN_NAME: &str = r"*Please send the name for the new main button \(e\.g\., OTT\), or go back\.*";
pub const MAIN_EXISTS: &str = r"*This main button already exists\. Please choose another name\.*";
pub const ADD_MAIN_FIRST: &str = r"*Please add a main button first before adding a sub\-button\.*";
pub const CHOOSE_MAIN_FOR_SUB: &str = r"*Select a main button to add a sub\-button to:*";
pub const INVALID_MAIN: &str = r"*Invalid main button selected\. Please try again\.*";
pub const START_OVER: &str = r"*An error occurred\. Please start over\.*";
pub const CHOOSE_MAIN_TO_REMOVE: &str =
    r"*Select a main button to remove \(this will also remove all its sub\-buttons and files\):*";
pub const MAIN_NOT_FOUND: &str = r"*Error\: Main button not found\.*";
pub const CHOOSE_MAIN_FOR_SUB_REMOVAL: &str = r"*Select a main button to see its sub\-buttons for removal:*";
pub const SUB_NOT_FOUND: &str = r"*Error\: Sub\-button not found\.*";
pub const ADD_MAIN_BEFORE_UPLOAD: &str = r"*Please add a main button first before uploading a file\.*";
pub const CHOOSE_MAIN_FOR_UPLOAD: &str = "*Select the main button for which you want to upload a file:*";
pub const CHOOSE_SUB_FOR_UPLOAD: &str = r"*Select the sub\-button for which you want to upload a \.txt file\:*";
pub const INVALID_SUB: &str = r"*Invalid sub\-button selected\. Please try again\.*";
pub const NO_USERS: &str = r"*No users have interacted with the bot yet\.*";
pub const CHOOSE_USER: &str = "*Select a user to manage:*";
pub const INVALID_USER: &str = r"*Invalid selection\. Please try again\.*";
pub const INVALID_ACTION: &str = r"*Invalid action selected\. Please try again\.*";
pub const INVALID_LINK: &str =
    r"*Invalid link format\. Please send a valid URL starting with http:// or https://\.*";
pub const OTP_LINK_OFF: &str = r"*✅ OTP Group Link has been turned off\. It will no longer be shown to users\.*";
pub const SEND_CATEGORY_NAME: &str =
    r"*Please send the name for the new file submission category \(e\.g\., Netflix\), or go back\.*";
pub const CATEGORY_EXISTS: &str = r"*This category name already exists\. Please choose another name\.*";
pub const NO_CATEGORIES_TO_REMOVE: &str = r"*There are no file submission categories to remove\.*";
pub const CHOOSE_CATEGORY_TO_REMOVE: &str = "*Select a file submission category to remove:*";
pub const CATEGORY_NOT_FOUND: &str = r"*Error: Category not found\.*";
pub const INVALID_TIME: &str =
    r"*Invalid time format\.* Please use a valid 12\-hour format like `10:30 AM` or `7:45 PM`\.";
pub const SCHEDULE_FAILED: &str = r"*The time was saved but the daily job could not be scheduled\.*";

pub fn welcome(user: &User) -> String {
    format!("*{}*", escape(&format!("👋 Welcome, {}!", user.first_name)))
}

pub fn cooldown(secs: u64) -> String {
    format!(r"*Please wait {} seconds before taking another number\.*", secs)
}

pub fn choose_sub(main: &str) -> String {
    format!(r"*Please choose a sub\-category from '{}':*", escape(main))
}

pub fn number(number: &str, otp_group_link: &str) -> String {
    let mut text = format!("✅ আপনার নাম্বার \\- {}\n\n", code_inline(number));
    if !otp_group_link.is_empty() {
        text.push_str("এই নাম্বারের Code রিসিভ করার জন্য নিচে Click Here এ Click করুন\\!\n");
        text.push_str(&format!("OTP Group \\- {}\n\n", link(otp_group_link, "Click here")));
    }
    text.push_str("⚙️যেকোনো সমস্যা হলে নিচের Support বাটনে ক্লিক করে আমাদের জানান।");
    text
}

pub fn upload_xlsx(category: &str) -> String {
    format!(
        "*You have selected '{}'\\.*\n\n*Please upload your \\.xlsx file now\\.*",
        escape(category)
    )
}

pub fn submitted(category: &str) -> String {
    format!(r"*✅ Your file for '{}' has been successfully submitted\!*", escape(category))
}

pub fn identity(emoji: &str, identity: &Identity) -> String {
    format!(
        "*{} Generated Identity:*\n\n*First name:* {}\n*Last name:* {}\n*Username:* {}\n*Password:* {}",
        emoji,
        code_inline(&identity.first_name),
        code_inline(&identity.last_name),
        code_inline(&identity.username),
        code_inline(&identity.password),
    )
}

pub fn totp_code(code: &str, remaining: u64) -> String {
    format!(
        "*🔐 2FA Authentication Code*\n\n*Your Code\\:* {}\n*Valid for\\:* {} seconds\n\n\
        *Note\\:* This code refreshes every 30 seconds\\. You can request a new code at any time\\.",
        code_inline(code),
        remaining
    )
}

pub fn info(user: &User) -> String {
    let na = "N/A".to_owned();
    format!(
        "*ℹ️ Your Info\\:*\n\n*▪️ ID\\:* {}\n*▪️ First Name\\:* {}\n*▪️ Last Name\\:* {}\n\
        *▪️ Username\\:* @{}\n*▪️ Language\\:* {}",
        code_inline(&user.id.0.to_string()),
        escape(&user.first_name),
        escape(user.last_name.as_ref().unwrap_or(&na)),
        escape(user.username.as_ref().unwrap_or(&na)),
        escape(user.language_code.as_ref().unwrap_or(&na)),
    )
}

pub fn support(username: &str) -> String {
    format!("*🆘 For support, please contact\\:* {}", escape(username))
}

pub fn broadcast(text: &str) -> String {
    format!("*📢 Broadcast Message:*\n\n{}", escape(text))
}

pub fn broadcast_done(sent: &str, failed: &str) -> String {
    format!(
        "*✅ Broadcast message sent to all users\\!*\nDelivered: {}, failed: {}",
        escape(sent),
        escape(failed)
    )
}

pub fn main_added(name: &str) -> String {
    format!(r"*✅ Main button '{}' added successfully\!*", escape(name))
}

pub fn send_sub_name(main: &str) -> String {
    format!(
        r"*Please send the name for the new sub\-button under '{}' \(e\.g\., Netflix\), or go back\.*",
        escape(main)
    )
}

pub fn sub_exists(main: &str) -> String {
    format!(
        r"*This sub\-button already exists under '{}'\. Please choose another name\.*",
        escape(main)
    )
}

pub fn sub_added(main: &str, sub: &str) -> String {
    format!(
        r"*✅ Sub\-button '{}' added successfully to '{}'\!*",
        escape(sub),
        escape(main)
    )
}

pub fn main_removed(name: &str) -> String {
    format!(r"*🗑️ Main button '{}' and all its sub\-buttons/files removed\.*", escape(name))
}

pub fn no_subs_to_remove(main: &str) -> String {
    format!(r"*There are no sub\-buttons to remove under '{}'\.*", escape(main))
}

pub fn choose_sub_to_remove(main: &str) -> String {
    format!(r"*Select a sub\-button to remove from '{}':*", escape(main))
}

pub fn sub_removed(sub: &str) -> String {
    format!(r"*🗑️ Sub\-button '{}' removed\.*", escape(sub))
}

pub fn add_sub_first(main: &str) -> String {
    format!(r"*Please add a sub\-button to '{}' first\.*", escape(main))
}

pub fn upload_txt(main: &str, sub: &str) -> String {
    format!(
        r"*Please upload the \.txt file for the '{} \> {}' button, or go back\.*",
        escape(main),
        escape(sub)
    )
}

pub fn pool_uploaded(main: &str, sub: &str) -> String {
    format!(r"*✅ File for '{} \> {}' uploaded successfully\!*", escape(main), escape(sub))
}

pub fn new_numbers(main: &str, sub: &str) -> String {
    format!(
        "*অ্যাডমিন {} এর জন্য '{}' এর নতুন নাম্বার যোগ করেছেন। এখন আপনি নাম্বার নিতে পারেন\\!*",
        escape(main),
        escape(sub)
    )
}

pub fn manage_user(user_id: u64) -> String {
    format!(r"*Managing user `{}`\. Select an action\:*", user_id)
}

pub fn blocked(user_id: u64) -> String {
    format!(r"*User `{}` has been blocked\.*", user_id)
}

pub fn already_blocked(user_id: u64) -> String {
    format!(r"*User `{}` is already blocked\.*", user_id)
}

pub fn unblocked(user_id: u64) -> String {
    format!(r"*User `{}` has been unblocked\.*", user_id)
}

pub fn not_blocked(user_id: u64) -> String {
    format!(r"*User `{}` is not blocked\.*", user_id)
}

pub fn send_otp_link(current: &str) -> String {
    let current = if current.is_empty() { "Not set" } else { current };
    format!(
        r"*Please send the new OTP group link \(current\: {}\), or go back\.*",
        escape(current)
    )
}

pub fn otp_link_set(link: &str) -> String {
    format!(r"*✅ OTP Group Link updated to\: {}\!*", escape(link))
}

pub fn category_added(name: &str) -> String {
    format!(
        r"*✅ File submission category '{}' added successfully\!*",
        escape(name)
    )
}

pub fn category_removed(name: &str) -> String {
    format!(r"*🗑️ File submission category '{}' removed\.*", escape(name))
}

pub fn send_delivery_time(current: &str) -> String {
    format!(
        "*Please send the daily delivery time for the master file\\.*\n\\(Current: *{}*\\)\n\n\
        Use 12\\-hour format with AM/PM \\(e\\.g\\., `10:30 AM`, `7:45 PM`\\)\\.",
        escape(current)
    )
}

pub fn delivery_time_set(time: &str) -> String {
    format!(r"*✅ Daily delivery time set to {} Bangladesh Time\.*", escape(time))
}

pub fn report_caption(category: &str, date: &str) -> String {
    format!(
        "*Daily User File Report for '{}' on {}*",
        escape(category),
        escape(date)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_message_with_and_without_link() {
        let with_link = number("+880-1", "https://t.me/+abc");
        assert!(with_link.contains("`+880-1`"));
        assert!(with_link.contains("[Click here](https://t.me/+abc)"));

        let without = number("+880-1", "");
        assert!(!without.contains("Click here"));
        assert!(without.ends_with("জানান।"));
    }

    #[test]
    fn user_text_is_escaped() {
        assert_eq!(support("@shihab98bc"), r"*🆘 For support, please contact\:* @shihab98bc");
        assert_eq!(broadcast("1.5 (ok)"), "*📢 Broadcast Message:*\n\n1\\.5 \\(ok\\)");
        assert_eq!(send_otp_link(""), r"*Please send the new OTP group link \(current\: Not set\), or go back\.*");
    }
}
