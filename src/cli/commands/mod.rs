mod init;
mod keys;

pub use init::cmd_init;
pub use keys::{cmd_keys_generate, cmd_keys_list, cmd_keys_make_unlimited, cmd_keys_purge_orphans};
