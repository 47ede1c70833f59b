use std::{fmt, str::FromStr};

/// Linkage of symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Linkage {
    /// The symbol is defined in the module and visible to other modules.
    External,

    /// The symbol may be replaced by another definition at link time.
    Weak,

    /// Same override semantics as [`Linkage::Weak`], but unreferenced
    /// definitions may be discarded.
    LinkOnce,

    /// The symbol is only visible inside the defining module.
    Internal,

    #[default]
    /// Like [`Linkage::Internal`], and the symbol never appears in symbol
    /// tables.
    Private,

    /// The definition exists only to enable optimization and is never
    /// emitted into the object.
    AvailableExternally,
}

impl Linkage {
    /// `true` if the linker may substitute another definition for this one.
    pub fn is_overridable(self) -> bool {
        matches!(self, Self::Weak | Self::LinkOnce)
    }

    /// `true` if the symbol is invisible outside the defining module.
    pub fn is_local(self) -> bool {
        matches!(self, Self::Internal | Self::Private)
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::External => write!(f, "external"),
            Self::Weak => write!(f, "weak"),
            Self::LinkOnce => write!(f, "linkonce"),
            Self::Internal => write!(f, "internal"),
            Self::Private => write!(f, "private"),
            Self::AvailableExternally => write!(f, "available_externally"),
        }
    }
}

impl FromStr for Linkage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external" => Ok(Self::External),
            "weak" => Ok(Self::Weak),
            "linkonce" => Ok(Self::LinkOnce),
            "internal" => Ok(Self::Internal),
            "private" => Ok(Self::Private),
            "available_externally" => Ok(Self::AvailableExternally),
            _ => Err(()),
        }
    }
}

/// Symbol visibility in the emitted object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Default,
    Hidden,
    Protected,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Hidden => write!(f, "hidden"),
            Self::Protected => write!(f, "protected"),
        }
    }
}
