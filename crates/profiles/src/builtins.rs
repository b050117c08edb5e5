//! Built-in profiles.
//!
//! | name | effect |
//! |------|--------|
//! | `invisible` | excludes windows from screen capture |
//! | `stealth` | hides the application from the Dock and app switcher |
//! | `unfocusable` | windows never become key or main |
//! | `click-through` | windows ignore mouse events |
//! | `core` | `invisible` plus Dock icon and menu bar hiding |
//! | `direct-control` | `core` plus direct window-server calls and a floating level |

use crate::{Profile, PropertyValue};

pub const INVISIBLE: &str = "invisible";
pub const STEALTH: &str = "stealth";
pub const UNFOCUSABLE: &str = "unfocusable";
pub const CLICK_THROUGH: &str = "click-through";
pub const CORE: &str = "core";
pub const DIRECT_CONTROL: &str = "direct-control";

pub const WINDOW: &str = "NSWindow";
pub const APPLICATION: &str = "NSApplication";

const SHARING_NONE: i64 = 0;
const POLICY_ACCESSORY: i64 = 1;
/// Auto-hide dock | auto-hide menu bar.
const PRESENTATION_AUTO_HIDE: i64 = (1 << 0) | (1 << 2);
/// Transient | ignores cycle | full-screen auxiliary.
const BEHAVIOR_STEALTH: i64 = (1 << 3) | (1 << 6) | (1 << 8);
const LEVEL_FLOATING: i64 = 3;

fn sharing_none() -> PropertyValue {
	PropertyValue::enumeration("none", SHARING_NONE)
}

fn accessory() -> PropertyValue {
	PropertyValue::enumeration("accessory", POLICY_ACCESSORY)
}

/// Every built-in profile, dependencies first.
pub fn all() -> Vec<Profile> {
	vec![
		Profile::builder(INVISIBLE)
			.description("Exclude windows from screen recording and screenshots")
			.set(WINDOW, "sharingType", sharing_none())
			.set(WINDOW, "hasShadow", false)
			.finish(),
		Profile::builder(STEALTH)
			.description("Hide the application from the Dock, menu bar and app switcher")
			.set(APPLICATION, "activationPolicy", accessory())
			.set(WINDOW, "collectionBehavior", BEHAVIOR_STEALTH)
			.finish(),
		Profile::builder(UNFOCUSABLE)
			.description("Prevent windows from receiving keyboard focus")
			.set(WINDOW, "canBecomeKeyWindow", false)
			.set(WINDOW, "canBecomeMainWindow", false)
			.finish(),
		Profile::builder(CLICK_THROUGH)
			.description("Let mouse events pass through to windows underneath")
			.set(WINDOW, "ignoresMouseEvents", true)
			.set(WINDOW, "acceptsMouseMovedEvents", false)
			.finish(),
		Profile::builder(CORE)
			.description("Screen capture protection, Dock icon hiding and menu bar hiding")
			.depends_on(INVISIBLE)
			.set(APPLICATION, "activationPolicy", accessory())
			.set(APPLICATION, "presentationOptions", PRESENTATION_AUTO_HIDE)
			.finish(),
		Profile::builder(DIRECT_CONTROL)
			.description("Core protection enforced through direct window-server calls")
			.depends_on(CORE)
			.set(WINDOW, "level", LEVEL_FLOATING)
			.direct_control(true)
			.finish(),
	]
}
