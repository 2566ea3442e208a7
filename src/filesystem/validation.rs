use std::path::Path;

/// Check whether the path exists; clap validators report errors as strings.
pub fn path_validator(path: String) -> Result<(), String> {
    if !Path::new(&path).exists() {
        Err(path + " is not a valid path.")
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_validator_correct_paths() {
        let correct_paths = [".", "./", "..", "../", "./..", "/"];

        for path in &correct_paths {
            assert_eq!(path_validator(path.to_string()), Ok(()));
        }
    }

    #[test]
    fn test_path_validator_incorrect_paths() {
        let incorrect_paths = [
            "impossible path",
            "../../../../impossible path",
            "/\\/",
            "\'`",
        ];

        for path in &incorrect_paths {
            assert_eq!(
                path_validator(path.to_string()),
                Err(path.to_string() + " is not a valid path.")
            );
        }
    }
}
