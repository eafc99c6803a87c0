use lazy_static::lazy_static;
use regex::Regex;
use teloxide::handler;
use teloxide::types::Document;

use super::*;
use crate::bot::broadcast::broadcast;
use crate::bot::entity::{parse_user_button, user_button};
use crate::bot::impls::{download, has_extension};
use crate::impls::LoggableErrorResult;
use crate::numbers::NumberPool;
use crate::registry::Added;
use crate::scheduler::{self, DailyJob};

type Pool = Arc<NumberPool>;

pub fn process_admin(handler: FSMHandler) -> FSMHandler {
    handler.branch(
        dptree::filter(filter_admin)
            .branch(dptree::filter(|text: Text| text.is(Label::BackToPanel)).endpoint(on_back_to_panel))
            .branch(handler![State::AwaitBroadcast].endpoint(on_broadcast))
            .branch(handler![State::ChooseAddKind].endpoint(on_add_kind))
            .branch(handler![State::ChooseRemoveKind].endpoint(on_remove_kind))
            .branch(handler![State::AwaitMainName].endpoint(on_main_name))
            .branch(handler![State::ChooseMainForSub].endpoint(on_main_for_sub))
            .branch(handler![State::AwaitSubName(main)].endpoint(on_sub_name))
            .branch(handler![State::ChooseMainToRemove].endpoint(on_main_to_remove))
            .branch(handler![State::ChooseMainForSubRemoval].endpoint(on_main_for_sub_removal))
            .branch(handler![State::ChooseSubToRemove(main)].endpoint(on_sub_to_remove))
            .branch(handler![State::ChooseMainForUpload].endpoint(on_main_for_upload))
            .branch(handler![State::ChooseSubForUpload(main)].endpoint(on_sub_for_upload))
            .branch(handler![State::AwaitPool(main, sub)].endpoint(on_await_pool_text))
            .branch(handler![State::ChooseUser].endpoint(on_choose_user))
            .branch(handler![State::ChooseUserAction(user_id)].endpoint(on_user_action))
            .branch(handler![State::AwaitOtpLink].endpoint(on_otp_link))
            .branch(handler![State::AwaitCategoryName].endpoint(on_category_name))
            .branch(handler![State::ChooseCategoryToRemove].endpoint(on_category_to_remove))
            .branch(handler![State::AwaitDeliveryTime].endpoint(on_delivery_time))
            .branch(handler![State::Ready].filter_map(admin_label).endpoint(on_admin_menu)),
    )
}

pub fn process_admin_document(handler: FSMHandler) -> FSMHandler {
    handler.branch(
        dptree::filter(filter_admin).branch(handler![State::AwaitPool(main, sub)].endpoint(on_pool_document)),
    )
}

fn admin_label(text: Text) -> Option<Label> {
    text.label().filter(|label| label.is_admin_only())
}

async fn on_back_to_panel(bot: WBot, dialogue: MyDialogue) -> FSMResult {
    to_admin_panel(&bot, &dialogue).await
}

async fn on_admin_menu(bot: WBot, dialogue: MyDialogue, label: Label, registry: Reg) -> FSMResult {
    let chat_id = dialogue.chat_id();
    match label {
        Label::AdminPanel => return to_admin_panel(&bot, &dialogue).await,
        Label::Broadcast => {
            dialogue.update(State::AwaitBroadcast).await?;
            send_with(&bot, chat_id, res::SEND_BROADCAST, keyboard::cancel()).await?;
        }
        Label::AddButton => {
            dialogue.update(State::ChooseAddKind).await?;
            send_with(&bot, chat_id, res::CHOOSE_ADD_KIND, keyboard::add_kind()).await?;
        }
        Label::RemoveButton => {
            if registry.main_buttons().is_empty() {
                send(&bot, chat_id, res::NO_BUTTONS).await?;
                return to_admin_panel(&bot, &dialogue).await;
            }
            dialogue.update(State::ChooseRemoveKind).await?;
            send_with(&bot, chat_id, res::CHOOSE_REMOVE_KIND, keyboard::remove_kind()).await?;
        }
        Label::UploadFile => {
            let prompt = Prompt::new(res::CHOOSE_MAIN_FOR_UPLOAD, res::ADD_MAIN_BEFORE_UPLOAD);
            return choose_main(&bot, &dialogue, &registry, State::ChooseMainForUpload, prompt).await;
        }
        Label::AddFileName => {
            dialogue.update(State::AwaitCategoryName).await?;
            send_with(&bot, chat_id, res::SEND_CATEGORY_NAME, keyboard::cancel()).await?;
        }
        Label::RemoveFileName => {
            let categories = registry.submission_categories();
            if categories.is_empty() {
                send(&bot, chat_id, res::NO_CATEGORIES_TO_REMOVE).await?;
                return to_admin_panel(&bot, &dialogue).await;
            }
            dialogue.update(State::ChooseCategoryToRemove).await?;
            let markup = keyboard::with_back(categories, Label::BackToPanel);
            send_with(&bot, chat_id, res::CHOOSE_CATEGORY_TO_REMOVE, markup).await?;
        }
        Label::SetTime => {
            let current = current_delivery_time(registry.delivery_schedule().time.as_deref());
            dialogue.update(State::AwaitDeliveryTime).await?;
            send_with(&bot, chat_id, res::send_delivery_time(&current), keyboard::cancel()).await?;
        }
        Label::UserList => return show_users(&bot, &dialogue, &registry).await,
        Label::SetOtpLink => {
            dialogue.update(State::AwaitOtpLink).await?;
            let text = res::send_otp_link(&registry.otp_group_link());
            send_with(&bot, chat_id, text, keyboard::cancel()).await?;
        }
        Label::OffOtpLink => {
            registry.set_otp_group_link("");
            log::info!("otp group link turned off");
            send(&bot, chat_id, res::OTP_LINK_OFF).await?;
            return to_admin_panel(&bot, &dialogue).await;
        }
        _ => {}
    }
    Ok(())
}

/// Reply texts for a keyboard of main buttons: the prompt and what to say when
/// there are none.
#[derive(Clone, Copy)]
struct Prompt {
    choose: &'static str,
    empty: &'static str,
}

impl Prompt {
    fn new(choose: &'static str, empty: &'static str) -> Self {
        Self { choose, empty }
    }
}

async fn choose_main(bot: &WBot, dialogue: &MyDialogue, registry: &Registry, next: State, prompt: Prompt) -> FSMResult {
    let mains = registry.main_buttons();
    if mains.is_empty() {
        send(bot, dialogue.chat_id(), prompt.empty).await?;
        return to_admin_panel(bot, dialogue).await;
    }
    dialogue.update(next).await?;
    send_with(bot, dialogue.chat_id(), prompt.choose, keyboard::with_back(mains, Label::BackToPanel)).await?;
    Ok(())
}

async fn on_broadcast(bot: WBot, dialogue: MyDialogue, text: Text, signal: Signal, registry: Reg) -> FSMResult {
    let message = res::broadcast(&text.0);
    let report = broadcast(&bot, &registry.user_ids(), &message, signal.user_id()).await;
    let done = res::broadcast_done(&report.sent_text(), &report.failed_text());
    send(&bot, dialogue.chat_id(), done).await?;
    to_admin_panel(&bot, &dialogue).await
}

// number buttons

async fn on_add_kind(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg) -> FSMResult {
    match text.label() {
        Some(Label::AddMain) => {
            dialogue.update(State::AwaitMainName).await?;
            send_with(&bot, dialogue.chat_id(), res::SEND_MAIN_NAME, keyboard::cancel()).await?;
        }
        Some(Label::AddSub) => {
            let prompt = Prompt::new(res::CHOOSE_MAIN_FOR_SUB, res::ADD_MAIN_FIRST);
            choose_main(&bot, &dialogue, &registry, State::ChooseMainForSub, prompt).await?;
        }
        _ => {}
    }
    Ok(())
}

async fn on_main_name(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg) -> FSMResult {
    let name = text.0;
    match registry.add_main_button(&name) {
        Added::Added => {
            log::info!("main button '{}' added", name);
            send(&bot, dialogue.chat_id(), res::main_added(&name)).await?;
            to_admin_panel(&bot, &dialogue).await
        }
        Added::AlreadyExists => {
            send(&bot, dialogue.chat_id(), res::MAIN_EXISTS).await?;
            Ok(())
        }
        Added::NoParent => start_over(&bot, &dialogue).await,
    }
}

async fn on_main_for_sub(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg) -> FSMResult {
    let main = text.0;
    if registry.sub_buttons(&main).is_none() {
        send(&bot, dialogue.chat_id(), res::INVALID_MAIN).await?;
        let prompt = Prompt::new(res::CHOOSE_MAIN_FOR_SUB, res::ADD_MAIN_FIRST);
        return choose_main(&bot, &dialogue, &registry, State::ChooseMainForSub, prompt).await;
    }
    let prompt = res::send_sub_name(&main);
    dialogue.update(State::AwaitSubName(main)).await?;
    send_with(&bot, dialogue.chat_id(), prompt, keyboard::cancel()).await?;
    Ok(())
}

async fn on_sub_name(bot: WBot, dialogue: MyDialogue, main: String, text: Text, registry: Reg) -> FSMResult {
    let sub = text.0;
    match registry.add_sub_button(&main, &sub) {
        Added::Added => {
            log::info!("sub button '{}' added to '{}'", sub, main);
            send(&bot, dialogue.chat_id(), res::sub_added(&main, &sub)).await?;
            to_admin_panel(&bot, &dialogue).await
        }
        Added::AlreadyExists => {
            send(&bot, dialogue.chat_id(), res::sub_exists(&main)).await?;
            Ok(())
        }
        Added::NoParent => start_over(&bot, &dialogue).await,
    }
}

async fn start_over(bot: &WBot, dialogue: &MyDialogue) -> FSMResult {
    send(bot, dialogue.chat_id(), res::START_OVER).await?;
    to_admin_panel(bot, dialogue).await
}

async fn on_remove_kind(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg) -> FSMResult {
    let (next, prompt) = match text.label() {
        Some(Label::RemoveMain) => (State::ChooseMainToRemove, res::CHOOSE_MAIN_TO_REMOVE),
        Some(Label::RemoveSub) => (State::ChooseMainForSubRemoval, res::CHOOSE_MAIN_FOR_SUB_REMOVAL),
        _ => return Ok(()),
    };
    choose_main(&bot, &dialogue, &registry, next, Prompt::new(prompt, res::NO_BUTTONS)).await
}

async fn on_main_to_remove(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg, pool: Pool) -> FSMResult {
    let name = text.0;
    let reply = match registry.remove_main_button(&name) {
        Some(button) => {
            for sub in &button.sub_buttons {
                pool.remove(&name, sub).await.ok_or_log();
            }
            log::info!("main button '{}' removed", name);
            res::main_removed(&name)
        }
        None => res::MAIN_NOT_FOUND.to_owned(),
    };
    send(&bot, dialogue.chat_id(), reply).await?;
    to_admin_panel(&bot, &dialogue).await
}

async fn on_main_for_sub_removal(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg) -> FSMResult {
    let main = text.0;
    match registry.sub_buttons(&main) {
        None => {
            send(&bot, dialogue.chat_id(), res::INVALID_MAIN).await?;
            let prompt = Prompt::new(res::CHOOSE_MAIN_FOR_SUB_REMOVAL, res::NO_BUTTONS);
            choose_main(&bot, &dialogue, &registry, State::ChooseMainForSubRemoval, prompt).await
        }
        Some(subs) if subs.is_empty() => {
            send(&bot, dialogue.chat_id(), res::no_subs_to_remove(&main)).await?;
            to_admin_panel(&bot, &dialogue).await
        }
        Some(subs) => {
            let prompt = res::choose_sub_to_remove(&main);
            dialogue.update(State::ChooseSubToRemove(main)).await?;
            send_with(&bot, dialogue.chat_id(), prompt, keyboard::with_back(subs, Label::BackToPanel)).await?;
            Ok(())
        }
    }
}

async fn on_sub_to_remove(bot: WBot, dialogue: MyDialogue, main: String, text: Text, registry: Reg, pool: Pool) -> FSMResult {
    let sub = text.0;
    let reply = if registry.remove_sub_button(&main, &sub) {
        pool.remove(&main, &sub).await.ok_or_log();
        log::info!("sub button '{}' removed from '{}'", sub, main);
        res::sub_removed(&sub)
    } else {
        res::SUB_NOT_FOUND.to_owned()
    };
    send(&bot, dialogue.chat_id(), reply).await?;
    to_admin_panel(&bot, &dialogue).await
}

// number pools

async fn on_main_for_upload(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg) -> FSMResult {
    let main = text.0;
    match registry.sub_buttons(&main) {
        None => {
            send(&bot, dialogue.chat_id(), res::INVALID_MAIN).await?;
            choose_main_for_upload(&bot, &dialogue, &registry).await
        }
        Some(subs) if subs.is_empty() => {
            send(&bot, dialogue.chat_id(), res::add_sub_first(&main)).await?;
            to_admin_panel(&bot, &dialogue).await
        }
        Some(subs) => {
            dialogue.update(State::ChooseSubForUpload(main)).await?;
            let markup = keyboard::with_back(subs, Label::BackToPanel);
            send_with(&bot, dialogue.chat_id(), res::CHOOSE_SUB_FOR_UPLOAD, markup).await?;
            Ok(())
        }
    }
}

async fn choose_main_for_upload(bot: &WBot, dialogue: &MyDialogue, registry: &Registry) -> FSMResult {
    let prompt = Prompt::new(res::CHOOSE_MAIN_FOR_UPLOAD, res::ADD_MAIN_BEFORE_UPLOAD);
    choose_main(bot, dialogue, registry, State::ChooseMainForUpload, prompt).await
}

async fn on_sub_for_upload(bot: WBot, dialogue: MyDialogue, main: String, text: Text, registry: Reg) -> FSMResult {
    let sub = text.0;
    if !registry.has_sub_button(&main, &sub) {
        send(&bot, dialogue.chat_id(), res::INVALID_SUB).await?;
        return choose_main_for_upload(&bot, &dialogue, &registry).await;
    }
    let prompt = res::upload_txt(&main, &sub);
    dialogue.update(State::AwaitPool(main, sub)).await?;
    send_with(&bot, dialogue.chat_id(), prompt, keyboard::cancel()).await?;
    Ok(())
}

async fn on_await_pool_text(bot: WBot, dialogue: MyDialogue) -> FSMResult {
    send(&bot, dialogue.chat_id(), res::UPLOAD_TXT).await?;
    Ok(())
}

/// Replaces the pool, restarts it from the first line and tells everyone else
/// that new numbers are available.
async fn on_pool_document(
    bot: WBot,
    dialogue: MyDialogue,
    (main, sub): (String, String),
    document: Document,
    signal: Signal,
    registry: Reg,
    pool: Pool,
) -> FSMResult {
    let chat_id = dialogue.chat_id();
    if !has_extension(&document, ".txt") {
        send(&bot, chat_id, res::NOT_TXT).await?;
        return Ok(());
    }
    let stored = match download(&bot, &document).await {
        Ok(content) => pool.store(&main, &sub, &content).await,
        Err(e) => Err(e),
    };
    match stored {
        Ok(path) => log::info!("pool for '{}_{}' replaced with {}", main, sub, path.display()),
        Err(e) => {
            log::error!("cannot store pool for '{}_{}': {:#}", main, sub, e);
            send(&bot, chat_id, res::SOMETHING_WRONG).await?;
            return Ok(());
        }
    }
    registry.reset_progress(&main, &sub);
    send(&bot, chat_id, res::pool_uploaded(&main, &sub)).await?;
    broadcast(&bot, &registry.user_ids(), &res::new_numbers(&main, &sub), signal.user_id()).await;
    to_admin_panel(&bot, &dialogue).await
}

// users

async fn show_users(bot: &WBot, dialogue: &MyDialogue, registry: &Registry) -> FSMResult {
    let users = registry.users();
    if users.is_empty() {
        send(bot, dialogue.chat_id(), res::NO_USERS).await?;
        return to_admin_panel(bot, dialogue).await;
    }
    let buttons = users
        .into_iter()
        .map(|(user_id, profile)| user_button(user_id, &profile.first_name, registry.is_blacklisted(user_id)))
        .collect();
    dialogue.update(State::ChooseUser).await?;
    send_with(bot, dialogue.chat_id(), res::CHOOSE_USER, keyboard::user_list(buttons)).await?;
    Ok(())
}

async fn on_choose_user(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg) -> FSMResult {
    let Some(user_id) = parse_user_button(&text.0) else {
        send(&bot, dialogue.chat_id(), res::INVALID_USER).await?;
        return show_users(&bot, &dialogue, &registry).await;
    };
    dialogue.update(State::ChooseUserAction(user_id)).await?;
    send_with(&bot, dialogue.chat_id(), res::manage_user(user_id.0), keyboard::user_action()).await?;
    Ok(())
}

/// Blocks or unblocks the chosen user, tells them about it and goes back to the
/// user list.
async fn on_user_action(bot: WBot, dialogue: MyDialogue, user_id: UserId, text: Text, conf: Conf, registry: Reg) -> FSMResult {
    let chat_id = dialogue.chat_id();
    match text.label() {
        Some(Label::BlockUser) => {
            if registry.block(user_id) {
                log::info!("user {} blocked", user_id.0);
                send(&bot, chat_id, res::blocked(user_id.0)).await?;
                if let Err(e) = send_blocked(&bot, ChatId::from(user_id), res::BLOCKED).await {
                    log::warn!("could not notify user {} of block: {}", user_id.0, e);
                }
            } else {
                send(&bot, chat_id, res::already_blocked(user_id.0)).await?;
            }
        }
        Some(Label::UnblockUser) => {
            if registry.unblock(user_id) {
                log::info!("user {} unblocked", user_id.0);
                send(&bot, chat_id, res::unblocked(user_id.0)).await?;
                let markup = keyboard::main_menu(conf.is_admin(user_id));
                if let Err(e) = send_with(&bot, ChatId::from(user_id), res::UNBLOCKED, markup).await {
                    log::warn!("could not notify user {} of unblock: {}", user_id.0, e);
                }
            } else {
                send(&bot, chat_id, res::not_blocked(user_id.0)).await?;
            }
        }
        _ => {
            send(&bot, chat_id, res::INVALID_ACTION).await?;
        }
    }
    show_users(&bot, &dialogue, &registry).await
}

// settings

lazy_static! {
    static ref LINK: Option<Regex> = Regex::new(r"^https?://\S+").ok();
}

fn is_valid_link(link: &str) -> bool {
    LINK.as_ref().map_or(false, |re| re.is_match(link))
}

async fn on_otp_link(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg) -> FSMResult {
    let link = text.0.trim();
    if !is_valid_link(link) {
        send(&bot, dialogue.chat_id(), res::INVALID_LINK).await?;
        return Ok(());
    }
    registry.set_otp_group_link(link);
    log::info!("otp group link set to {}", link);
    send(&bot, dialogue.chat_id(), res::otp_link_set(link)).await?;
    to_admin_panel(&bot, &dialogue).await
}

async fn on_category_name(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg) -> FSMResult {
    let name = text.0;
    match registry.add_submission_category(&name) {
        Added::AlreadyExists => {
            send(&bot, dialogue.chat_id(), res::CATEGORY_EXISTS).await?;
            Ok(())
        }
        _ => {
            log::info!("submission category '{}' added", name);
            send(&bot, dialogue.chat_id(), res::category_added(&name)).await?;
            to_admin_panel(&bot, &dialogue).await
        }
    }
}

async fn on_category_to_remove(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg) -> FSMResult {
    let name = text.0;
    let reply = if registry.remove_submission_category(&name) {
        log::info!("submission category '{}' removed", name);
        res::category_removed(&name)
    } else {
        res::CATEGORY_NOT_FOUND.to_owned()
    };
    send(&bot, dialogue.chat_id(), reply).await?;
    to_admin_panel(&bot, &dialogue).await
}

fn current_delivery_time(stored: Option<&str>) -> String {
    match stored {
        None => "Not set".to_owned(),
        Some(stored) => scheduler::parse_stored(stored)
            .map(scheduler::format_12h)
            .unwrap_or_else(|| "Invalid format".to_owned()),
    }
}

async fn on_delivery_time(bot: WBot, dialogue: MyDialogue, text: Text, registry: Reg, job: Arc<DailyJob>) -> FSMResult {
    let chat_id = dialogue.chat_id();
    let Some(time) = scheduler::parse_time_12h(&text.0) else {
        send(&bot, chat_id, res::INVALID_TIME).await?;
        return Ok(());
    };
    registry.set_delivery_time(scheduler::to_stored(time));
    if let Err(e) = job.reschedule(&registry.delivery_schedule()) {
        log::error!("failed to schedule daily job: {:#}", e);
        send(&bot, chat_id, res::SCHEDULE_FAILED).await?;
    }
    send(&bot, chat_id, res::delivery_time_set(text.0.trim())).await?;
    to_admin_panel(&bot, &dialogue).await
}
