pub mod forged_origin_prefix_hijack;
pub mod legitimate_prefix_only;
pub mod non_routed_prefix_hijack;
pub mod prefix_hijack;
pub mod subprefix_hijack;

pub use forged_origin_prefix_hijack::ForgedOriginPrefixHijack;
pub use legitimate_prefix_only::LegitimatePrefixOnly;
pub use non_routed_prefix_hijack::NonRoutedPrefixHijack;
pub use prefix_hijack::PrefixHijack;
pub use subprefix_hijack::SubprefixHijack;
