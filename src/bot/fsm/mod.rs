use std::sync::Arc;

use teloxide::dispatching::DpHandlerDescription;
use teloxide::prelude::*;
use teloxide::types::{ChatId, UserId};

use self::admin::{process_admin, process_admin_document};
use self::user::{process_user, process_user_document};

use super::entity::{Label, Signal, Text};
use super::impls::{send, send_blocked, send_with};
use super::{keyboard, res, MyStorage, WBot};
use crate::persistent::UserProfile;
use crate::registry::Registry;
use crate::settings::Settings;

mod admin;
mod user;

type MyDialogue = Dialogue<State, MyStorage>;
type Conf = Arc<Settings>;
type Reg = Arc<Registry>;

pub type FSMResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
pub type FSMHandler = Handler<'static, DependencyMap, FSMResult, DpHandlerDescription>;

#[derive(Clone, Debug, Default)]
pub enum State {
    #[default]
    Ready,
    // user flows
    ChooseCategory,
    ChooseSubCategory(String),
    ChooseSubmission,
    AwaitSubmission(String),
    ChooseGender,
    AwaitSecret,
    // admin flows
    AwaitBroadcast,
    ChooseAddKind,
    ChooseRemoveKind,
    AwaitMainName,
    ChooseMainForSub,
    AwaitSubName(String),
    ChooseMainToRemove,
    ChooseMainForSubRemoval,
    ChooseSubToRemove(String),
    ChooseMainForUpload,
    ChooseSubForUpload(String),
    AwaitPool(String, String),
    ChooseUser,
    ChooseUserAction(UserId),
    AwaitOtpLink,
    AwaitCategoryName,
    ChooseCategoryToRemove,
    AwaitDeliveryTime,
}

pub fn make_dialogue_handler() -> FSMHandler {
    dptree::filter_map(Signal::from_update)
        .enter_dialogue::<Signal, MyStorage, State>()
        .branch(dptree::filter(is_blocked).endpoint(on_blocked))
        .branch(dptree::filter(|signal: Signal| signal.is_start()).endpoint(on_start))
        .branch(
            dptree::filter_map(Signal::filter_document)
                .branch(process_admin_document(dptree::entry()))
                .branch(process_user_document(dptree::entry()))
                .endpoint(on_unexpected_document),
        )
        .branch(
            dptree::filter_map(Signal::filter_text)
                .branch(dptree::filter(|text: Text| text.is(Label::BackToMain)).endpoint(on_start))
                .branch(process_admin(dptree::entry()))
                .branch(process_user(dptree::entry())),
        )
        .endpoint(ignore)
}

fn is_blocked(signal: Signal, registry: Reg) -> bool {
    registry.is_blacklisted(signal.user_id())
}

fn filter_admin(signal: Signal, conf: Conf) -> bool {
    conf.is_admin(signal.user_id())
}

async fn ignore() -> FSMResult {
    Ok(())
}

async fn on_blocked(bot: WBot, dialogue: MyDialogue) -> FSMResult {
    send_blocked(&bot, dialogue.chat_id(), res::BLOCKED).await?;
    Ok(())
}

async fn on_start(bot: WBot, dialogue: MyDialogue, signal: Signal, conf: Conf, registry: Reg) -> FSMResult {
    let user = signal.user();
    let profile = UserProfile {
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
    };
    if registry.register_user(user.id, profile) {
        log::info!("new user {} registered", user.id.0);
        send(&bot, dialogue.chat_id(), res::welcome(user)).await?;
    }
    to_main_menu(&bot, &dialogue, conf.is_admin(user.id)).await
}

async fn on_unexpected_document(bot: WBot, dialogue: MyDialogue, signal: Signal, conf: Conf) -> FSMResult {
    let text = if conf.is_admin(signal.user_id()) {
        res::UNEXPECTED_FILE_ADMIN
    } else {
        res::UNEXPECTED_FILE
    };
    send(&bot, dialogue.chat_id(), text).await?;
    Ok(())
}

async fn to_main_menu(bot: &WBot, dialogue: &MyDialogue, is_admin: bool) -> FSMResult {
    dialogue.exit().await?;
    send_with(bot, dialogue.chat_id(), res::MAIN_MENU, keyboard::main_menu(is_admin)).await?;
    Ok(())
}

async fn to_admin_panel(bot: &WBot, dialogue: &MyDialogue) -> FSMResult {
    dialogue.exit().await?;
    send_with(bot, dialogue.chat_id(), res::ADMIN_PANEL, keyboard::admin_panel()).await?;
    Ok(())
}
