//! Variable name space shared by the evaluator and completion.
//!
//! `$name` environment variables are a fixed set; `%name` user
//! variables are free-form; `.name` buffer variables belong to
//! procedure buffers.

/// Environment variable names, sorted, as completed after `$`.
/// The evaluator is the authority on their values.
pub const ENV_VARS: &[&str] = &[
    "acount",
    "asave",
    "binary_threshold",
    "cbufname",
    "cfname",
    "cmode",
    "crypt_mode",
    "curcol",
    "curline",
    "curwidth",
    "cwline",
    "debug",
    "discmd",
    "disinp",
    "fillcol",
    "force_status",
    "gmode",
    "kill",
    "line",
    "lwidth",
    "match",
    "overlap",
    "pagelen",
    "progname",
    "ptt_mode",
    "replace",
    "rval",
    "search",
    "seed",
    "srch_can_hunt",
    "status",
    "tab",
    "version",
    "yankmode",
];

impl crate::Editor {
    pub fn uvar(&self, name: &str) -> Option<&str> {
        self.uvars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_uvar(&mut self, name: &str, value: &str) {
        match self.uvars.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.uvars.push((name.to_string(), value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn env_list_is_sorted() {
        let mut sorted = super::ENV_VARS.to_vec();
        sorted.sort();
        assert_eq!(sorted, super::ENV_VARS);
    }
}
