use std::time::Duration;

use chrono::{Local, Utc};
use teloxide::payloads::SendMessageSetters;
use teloxide::types::{Document, ParseMode};

use super::*;
use crate::bot::impls::{download, has_extension};
use crate::fakename::{Gender, Identity};
use crate::numbers::{Dispensed, Dispenser, NumberPool};
use crate::submissions::SubmissionBox;
use crate::totp;

pub fn process_user(handler: FSMHandler) -> FSMHandler {
    handler
        .branch(teloxide::handler![State::ChooseCategory].endpoint(on_choose_category))
        .branch(teloxide::handler![State::ChooseSubCategory(main)].endpoint(on_choose_sub_category))
        .branch(teloxide::handler![State::ChooseSubmission].endpoint(on_choose_submission))
        .branch(teloxide::handler![State::AwaitSubmission(category)].endpoint(on_await_submission_text))
        .branch(teloxide::handler![State::ChooseGender].endpoint(on_choose_gender))
        .branch(teloxide::handler![State::AwaitSecret].endpoint(on_await_secret))
        .branch(
            teloxide::handler![State::Ready]
                .filter_map(user_label)
                .endpoint(on_menu),
        )
}

pub fn process_user_document(handler: FSMHandler) -> FSMHandler {
    handler.branch(teloxide::handler![State::AwaitSubmission(category)].endpoint(on_submission))
}

fn user_label(text: Text) -> Option<Label> {
    text.label().filter(|label| !label.is_admin_only())
}

async fn on_menu(bot: WBot, dialogue: MyDialogue, label: Label, signal: Signal, conf: Conf, registry: Reg) -> FSMResult {
    let chat_id = dialogue.chat_id();
    match label {
        Label::GetNumber => show_categories(&bot, &dialogue, &registry).await?,
        Label::SubmitFile => show_submissions(&bot, &dialogue, &registry).await?,
        Label::FakeName => {
            dialogue.update(State::ChooseGender).await?;
            send_with(&bot, chat_id, res::CHOOSE_GENDER, keyboard::gender()).await?;
        }
        Label::Get2fa => {
            dialogue.update(State::AwaitSecret).await?;
            let has_saved = registry.saved_secret(signal.user_id()).is_some();
            let text = if has_saved { res::TOTP_SAVED } else { res::TOTP_NEW };
            send_with(&bot, chat_id, text, keyboard::totp(has_saved)).await?;
        }
        Label::Info => {
            send(&bot, chat_id, res::info(signal.user())).await?;
        }
        Label::Support => {
            send(&bot, chat_id, res::support(&conf.support_username)).await?;
        }
        _ => {}
    }
    Ok(())
}

// numbers

async fn show_categories(bot: &WBot, dialogue: &MyDialogue, registry: &Registry) -> FSMResult {
    let buttons = registry.main_buttons();
    if buttons.is_empty() {
        send(bot, dialogue.chat_id(), res::NO_CATEGORIES).await?;
        return Ok(());
    }
    dialogue.update(State::ChooseCategory).await?;
    send_with(bot, dialogue.chat_id(), res::CHOOSE_CATEGORY, keyboard::with_back(buttons, Label::BackToMain)).await?;
    Ok(())
}

async fn on_choose_category(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg) -> FSMResult {
    let main = text.0;
    match registry.sub_buttons(&main) {
        None => {
            send(&bot, dialogue.chat_id(), res::INVALID_CATEGORY).await?;
            show_categories(&bot, &dialogue, &registry).await
        }
        Some(subs) if subs.is_empty() => {
            send(&bot, dialogue.chat_id(), res::EMPTY_CATEGORY).await?;
            show_categories(&bot, &dialogue, &registry).await
        }
        Some(subs) => {
            let prompt = res::choose_sub(&main);
            dialogue.update(State::ChooseSubCategory(main)).await?;
            send_with(&bot, dialogue.chat_id(), prompt, keyboard::with_back(subs, Label::BackToMain)).await?;
            Ok(())
        }
    }
}

/// Stays in the sub-category state so the user can take another number.
async fn on_choose_sub_category(
    bot: WBot,
    dialogue: MyDialogue,
    main: String,
    text: Text,
    registry: Reg,
    pool: Arc<NumberPool>,
    dispenser: Arc<Dispenser>,
) -> FSMResult {
    let chat_id = dialogue.chat_id();
    let sub = text.0;
    if !registry.has_sub_button(&main, &sub) {
        send(&bot, chat_id, res::INVALID_CATEGORY).await?;
        return Ok(());
    }
    let dispensed = match dispenser.dispense(&registry, &pool, &main, &sub).await {
        Ok(dispensed) => dispensed,
        Err(e) => {
            log::error!("cannot dispense a number from '{}_{}': {:#}", main, sub, e);
            send(&bot, chat_id, res::SOMETHING_WRONG).await?;
            return Ok(());
        }
    };
    match dispensed {
        Dispensed::Number(number) => {
            log::info!("number from '{}_{}' given to user {}", main, sub, chat_id.0);
            bot.send_message(chat_id, res::number(&number, &registry.otp_group_link()))
                .parse_mode(ParseMode::MarkdownV2)
                .disable_web_page_preview(true)
                .await?;
        }
        Dispensed::Cooldown(left) => {
            send(&bot, chat_id, res::cooldown(whole_secs(left))).await?;
        }
        Dispensed::Exhausted => {
            send(&bot, chat_id, res::ALL_DISTRIBUTED).await?;
        }
        Dispensed::Missing => {
            send(&bot, chat_id, res::NOT_UPLOADED).await?;
        }
    }
    Ok(())
}

fn whole_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

// file submissions

async fn show_submissions(bot: &WBot, dialogue: &MyDialogue, registry: &Registry) -> FSMResult {
    let categories = registry.submission_categories();
    if categories.is_empty() {
        send(bot, dialogue.chat_id(), res::NO_SUBMISSION_CATEGORIES).await?;
        return Ok(());
    }
    dialogue.update(State::ChooseSubmission).await?;
    send_with(bot, dialogue.chat_id(), res::CHOOSE_SUBMISSION, keyboard::with_back(categories, Label::BackToMain)).await?;
    Ok(())
}

async fn on_choose_submission(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg) -> FSMResult {
    let category = text.0;
    if !registry.has_submission_category(&category) {
        send(&bot, dialogue.chat_id(), res::INVALID_SUBMISSION).await?;
        return show_submissions(&bot, &dialogue, &registry).await;
    }
    let prompt = res::upload_xlsx(&category);
    dialogue.update(State::AwaitSubmission(category)).await?;
    send_with(&bot, dialogue.chat_id(), prompt, keyboard::back_to_main()).await?;
    Ok(())
}

async fn on_await_submission_text(bot: WBot, dialogue: MyDialogue) -> FSMResult {
    send(&bot, dialogue.chat_id(), res::UPLOAD_XLSX).await?;
    Ok(())
}

async fn on_submission(
    bot: WBot,
    dialogue: MyDialogue,
    category: String,
    document: Document,
    signal: Signal,
    conf: Conf,
    submissions: Arc<SubmissionBox>,
) -> FSMResult {
    let chat_id = dialogue.chat_id();
    if !has_extension(&document, ".xlsx") {
        send(&bot, chat_id, res::NOT_XLSX).await?;
        return Ok(());
    }
    let user_id = signal.user_id();
    let stored = match download(&bot, &document).await {
        Ok(content) => {
            let (submissions, category) = (submissions.clone(), category.clone());
            tokio::task::spawn_blocking(move || submissions.store(user_id, &category, &content)).await?
        }
        Err(e) => Err(e),
    };
    if let Err(e) = stored {
        log::error!("cannot store submission of user {} for '{}': {:#}", user_id.0, category, e);
        send(&bot, chat_id, res::SOMETHING_WRONG).await?;
        return Ok(());
    }
    send(&bot, chat_id, res::submitted(&category)).await?;
    to_main_menu(&bot, &dialogue, conf.is_admin(user_id)).await
}

// fake name

async fn on_choose_gender(bot: WBot, dialogue: MyDialogue, text: Text, signal: Signal, conf: Conf) -> FSMResult {
    let gender = match text.label() {
        Some(Label::Male) => Gender::Male,
        Some(Label::Female) => Gender::Female,
        _ => {
            send(&bot, dialogue.chat_id(), res::INVALID_CHOICE).await?;
            return Ok(());
        }
    };
    let identity = Identity::generate(gender, &mut rand::thread_rng(), Local::now().date_naive());
    send(&bot, dialogue.chat_id(), res::identity(gender.emoji(), &identity)).await?;
    to_main_menu(&bot, &dialogue, conf.is_admin(signal.user_id())).await
}

// 2fa

async fn on_await_secret(bot: WBot, dialogue: MyDialogue, text: Text, signal: Signal, conf: Conf, registry: Reg) -> FSMResult {
    let chat_id = dialogue.chat_id();
    let user_id = signal.user_id();
    let is_admin = conf.is_admin(user_id);
    match text.label() {
        Some(Label::UseSavedKey) => match registry.saved_secret(user_id) {
            Some(secret) => send_code(&bot, &dialogue, &secret, is_admin).await?,
            None => {
                send(&bot, chat_id, res::TOTP_NO_SAVED).await?;
            }
        },
        Some(Label::EnterNewKey) => {
            send_with(&bot, chat_id, res::TOTP_ENTER_NEW, keyboard::back_to_main()).await?;
        }
        _ if !totp::is_valid_secret(&text.0) => {
            send(&bot, chat_id, res::TOTP_INVALID).await?;
        }
        _ => {
            registry.save_secret(user_id, &text.0);
            send_code(&bot, &dialogue, &text.0, is_admin).await?;
        }
    }
    Ok(())
}

async fn send_code(bot: &WBot, dialogue: &MyDialogue, secret: &str, is_admin: bool) -> FSMResult {
    let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
    let code = match totp::generate(secret, now) {
        Ok(code) => code,
        Err(e) => {
            log::error!("error generating totp: {:#}", e);
            send(bot, dialogue.chat_id(), res::TOTP_ERROR).await?;
            return Ok(());
        }
    };
    dialogue.exit().await?;
    let text = res::totp_code(&code, totp::remaining_secs(now));
    send_with(bot, dialogue.chat_id(), text, keyboard::main_menu(is_admin)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_is_rounded_up() {
        assert_eq!(whole_secs(Duration::from_secs(10)), 10);
        assert_eq!(whole_secs(Duration::from_millis(9_001)), 10);
        assert_eq!(whole_secs(Duration::from_millis(300)), 1);
    }

    #[test]
    fn admin_labels_are_not_user_menu() {
        assert_eq!(user_label(Text(Label::GetNumber.text().into())), Some(Label::GetNumber));
        assert_eq!(user_label(Text(Label::Broadcast.text().into())), None);
        assert_eq!(user_label(Text("OTT".into())), None);
    }
}
