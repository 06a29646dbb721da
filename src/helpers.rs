use formato::Formato;

pub const NIX_STORE: &str = "/nix/store/";

/// Human size of a megabyte amount: `512K`, `12.5M`, `2.0G`.
pub fn format_size(mb: f64) -> String {
    if mb < 1. {
        format!("{:.0}K", mb * 1024.)
    } else if mb < 1024. {
        format!("{}M", mb.formato("#.0"))
    } else {
        format!("{}G", (mb / 1024.).formato("#.0"))
    }
}

/// Fits a command into `max_len` characters. Store paths become `package/binary`,
/// other paths their file name, anything else is cut with an ellipsis.
pub fn shorten_command(cmd: &str, max_len: usize) -> String {
    if cmd.chars().count() <= max_len {
        return cmd.to_string();
    }

    if let Some((_, store)) = cmd.split_once(NIX_STORE) {
        let mut parts = store.split('/');
        let hash_name = parts.next().unwrap_or_default();
        //hash-name, drop the hash
        if let Some((_, package)) = hash_name.split_once('-') {
            let binary = store.rsplit('/').next().unwrap_or(hash_name);
            let short = format!("{package}/{binary}");
            if short.chars().count() <= max_len {
                return short;
            }
            return binary.to_string();
        }
    }

    if let Some((_, last)) = cmd.rsplit_once('/') {
        return last.to_string();
    }

    let mut short: String = cmd.chars().take(max_len.saturating_sub(1)).collect();
    short.push('…');
    short
}
