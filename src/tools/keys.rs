//! Key and scroll-direction names accepted by the input tools.
//!
//! Key names follow the `Vc*` virtual-key convention of libuiohook
//! (`VcA`, `VcEnter`, `VcLeftControl`, ...). Parsing is exact and
//! case-sensitive; `GetAllKeyNames` hands the model the full list.

use std::fmt;
use std::str::FromStr;

macro_rules! key_codes {
    ($($name:ident),+ $(,)?) => {
        /// A virtual key code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum KeyCode {
            $($name),+
        }

        impl KeyCode {
            /// Every key name, in declaration order.
            pub const NAMES: &'static [&'static str] = &[$(stringify!($name)),+];

            pub fn name(self) -> &'static str {
                match self {
                    $(KeyCode::$name => stringify!($name)),+
                }
            }
        }

        impl FromStr for KeyCode {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($name) => Ok(KeyCode::$name),)+
                    _ => Err(()),
                }
            }
        }
    };
}

key_codes! {
    VcEscape,
    VcF1, VcF2, VcF3, VcF4, VcF5, VcF6, VcF7, VcF8, VcF9, VcF10, VcF11, VcF12,
    VcF13, VcF14, VcF15, VcF16, VcF17, VcF18, VcF19, VcF20, VcF21, VcF22, VcF23, VcF24,
    VcBackQuote,
    Vc1, Vc2, Vc3, Vc4, Vc5, Vc6, Vc7, Vc8, Vc9, Vc0,
    VcMinus, VcEquals, VcBackspace, VcTab, VcCapsLock,
    VcA, VcB, VcC, VcD, VcE, VcF, VcG, VcH, VcI, VcJ, VcK, VcL, VcM,
    VcN, VcO, VcP, VcQ, VcR, VcS, VcT, VcU, VcV, VcW, VcX, VcY, VcZ,
    VcOpenBracket, VcCloseBracket, VcBackslash,
    VcSemicolon, VcQuote, VcEnter,
    VcComma, VcPeriod, VcSlash,
    VcSpace,
    VcPrintScreen, VcScrollLock, VcPause,
    VcInsert, VcDelete, VcHome, VcEnd, VcPageUp, VcPageDown,
    VcUp, VcLeft, VcRight, VcDown,
    VcNumLock, VcNumPadDivide, VcNumPadMultiply, VcNumPadSubtract, VcNumPadEquals,
    VcNumPadAdd, VcNumPadEnter, VcNumPadSeparator, VcNumPadDecimal,
    VcNumPad0, VcNumPad1, VcNumPad2, VcNumPad3, VcNumPad4,
    VcNumPad5, VcNumPad6, VcNumPad7, VcNumPad8, VcNumPad9,
    VcLeftShift, VcRightShift, VcLeftControl, VcRightControl,
    VcLeftAlt, VcRightAlt, VcLeftMeta, VcRightMeta, VcContextMenu,
    VcPower, VcSleep, VcWake,
    VcMediaPlay, VcMediaStop, VcMediaPrevious, VcMediaNext, VcMediaSelect, VcMediaEject,
    VcVolumeMute, VcVolumeUp, VcVolumeDown,
    VcAppMail, VcAppCalculator, VcAppMusic, VcAppPictures,
    VcBrowserSearch, VcBrowserHome, VcBrowserBack, VcBrowserForward,
    VcBrowserStop, VcBrowserRefresh, VcBrowserFavorites,
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mouse wheel axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Vertical,
    Horizontal,
}

impl ScrollDirection {
    pub const NAMES: &'static [&'static str] = &["Vertical", "Horizontal"];
}

impl FromStr for ScrollDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Vertical" => Ok(ScrollDirection::Vertical),
            "Horizontal" => Ok(ScrollDirection::Horizontal),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScrollDirection::Vertical => "Vertical",
            ScrollDirection::Horizontal => "Horizontal",
        })
    }
}

/// Mouse buttons used by the click tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}
