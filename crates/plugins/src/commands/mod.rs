pub mod echo;
pub mod help;
pub mod ping;
pub mod suggest;

pub use echo::EchoPlugin;
pub use help::HelpPlugin;
pub use ping::PingPlugin;
pub use suggest::SuggestPlugin;
