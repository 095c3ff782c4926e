//! Shared status icons, with plain-text fallbacks for terminals without emoji.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "[NEW] ");
pub static ALERT: Emoji<'_, '_> = Emoji("🚨 ", "[!] ");
pub static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "");
pub static DOT: Emoji<'_, '_> = Emoji("· ", "- ");
