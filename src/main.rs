//! asyncbot demo firmware: a small Telegram bot on an ESP32.
//!
//! Joins WiFi, connects to the bot API and answers in a cooperative loop:
//! `/start` shows an inline keyboard, locations and documents are echoed
//! back, everything else is repeated.
//!
//! Credentials are baked in at build time:
//! `WIFI_SSID`, `WIFI_PASS` and `BOT_TOKEN`.

#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use asyncbot::adapters::time::SystemClock;
use asyncbot::adapters::tls_transport::TlsTransport;
use asyncbot::app::keyboard::InlineKeyboard;
use asyncbot::app::message::{CallbackQuery, Message};
use asyncbot::{BotConfig, BotSession};

// ── Build-time settings ───────────────────────────────────────

const WIFI_SSID: &str = match option_env!("WIFI_SSID") {
    Some(v) => v,
    None => "",
};
const WIFI_PASS: &str = match option_env!("WIFI_PASS") {
    Some(v) => v,
    None => "",
};
const BOT_TOKEN: &str = match option_env!("BOT_TOKEN") {
    Some(v) => v,
    None => "",
};

/// Pause between two ticks of the main loop.
const LOOP_DELAY_MS: u32 = 20;

type Bot = BotSession<TlsTransport, SystemClock>;

// ── Keyboard callbacks ────────────────────────────────────────

fn on_light_on(query: &CallbackQuery) {
    info!("Demo: light ON requested by {}", query.envelope.sender.id);
}

fn on_light_off(query: &CallbackQuery) {
    info!("Demo: light OFF requested by {}", query.envelope.sender.id);
}

fn light_keyboard() -> InlineKeyboard {
    let mut kb = InlineKeyboard::new();
    kb.add_button("Light ON", "LIGHT_ON", Some(on_light_on))
        .add_button("Light OFF", "LIGHT_OFF", Some(on_light_off))
        .add_row()
        .add_url("Bot API docs", "https://core.telegram.org/bots/api");
    kb
}

// ── Message handling ──────────────────────────────────────────

fn handle(bot: &mut Bot, msg: &Message, menu: &str) -> asyncbot::Result<()> {
    match msg {
        Message::Text { text, .. } if text == "/start" => {
            bot.reply(msg, "What should the light do?", Some(menu))
        }
        Message::CallbackQuery(query) => bot.end_query(query, &format!("Got {}", query.data), false),
        Message::Location { location, .. } => bot.reply(
            msg,
            &format!("You are at {:.5}, {:.5}", location.latitude, location.longitude),
            None,
        ),
        Message::Contact { contact, .. } => {
            bot.reply(msg, &format!("Saved {}", contact.phone_number), None)
        }
        Message::Document { document, .. } => match &document.url {
            Some(url) => bot.reply(msg, &format!("Download: {url}"), None),
            None => bot.reply(msg, "Could not resolve that file", None),
        },
        Message::Text { text, .. } | Message::Reply { text, .. } => bot.reply(msg, text, None),
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("asyncbot demo v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. WiFi station ───────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: WIFI_SSID
            .try_into()
            .map_err(|_| anyhow!("WIFI_SSID too long"))?,
        password: WIFI_PASS
            .try_into()
            .map_err(|_| anyhow!("WIFI_PASS too long"))?,
        auth_method: if WIFI_PASS.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    info!("WiFi: connected to '{}'", WIFI_SSID);

    // ── 3. Bot session ────────────────────────────────────────
    let mut bot = BotSession::new(
        TlsTransport::new(),
        SystemClock::new(),
        BOT_TOKEN,
        BotConfig::default(),
    )?;
    if let Err(e) = bot.begin() {
        warn!("Bot: getMe failed ({}), continuing", e);
    }
    if let Err(e) = bot.set_my_commands("start", "Show the light menu") {
        warn!("Bot: command registration failed ({})", e);
    }
    if let Err(e) = bot.no_new_message() {
        warn!("Bot: could not skip old updates ({})", e);
    }

    let keyboard = light_keyboard();
    let menu = keyboard.to_json();
    bot.add_keyboard(Box::new(keyboard))?;

    // ── 4. Cooperative loop ───────────────────────────────────
    loop {
        match bot.next_message() {
            Ok(Some(msg)) => {
                if let Err(e) = handle(&mut bot, &msg, &menu) {
                    warn!("Bot: reply failed ({})", e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Bot: {}", e),
        }
        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}
