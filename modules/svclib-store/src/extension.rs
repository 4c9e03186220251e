//! Content-type to filename-extension mapping, with a handful of
//! domain-specific overrides `mime_guess` doesn't know about.

pub fn extension_for(content_type: &str) -> String {
    match content_type {
        "application/postscript" => ".ps".to_string(),
        "application/x-netcdf" => ".nc".to_string(),
        "text/plain" => ".txt".to_string(),
        "application/binary" => ".bin".to_string(),
        "application/x-bufr" => ".bufr".to_string(),
        "application/x-grib" => ".grib".to_string(),
        "application/x-odb" => ".odb".to_string(),
        _ => mime_guess::get_mime_extensions_str(content_type)
            .and_then(|exts| exts.first())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_overrides_win_over_mime_guess() {
        assert_eq!(extension_for("application/postscript"), ".ps");
        assert_eq!(extension_for("text/plain"), ".txt");
    }

    #[test]
    fn falls_back_to_mime_guess() {
        assert_eq!(extension_for("image/png"), ".png");
    }

    #[test]
    fn unknown_type_yields_empty_extension() {
        assert_eq!(extension_for("application/x-totally-unknown"), "");
    }
}
