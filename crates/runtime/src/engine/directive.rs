//! Building the command text sent to the engine

use crate::executor::HALT_DIRECTIVE;
use crate::types::ModuleName;

/// Trim and make sure the statement ends with exactly the period it needs.
///
/// Already-terminated input is returned trimmed but otherwise unchanged.
pub fn normalize_query(query: &str) -> String {
    let trimmed = query.trim();
    if trimmed.ends_with('.') {
        trimmed.to_string()
    } else {
        format!("{}.", trimmed)
    }
}

/// Qualify a normalized goal with `@module` unless the module is the default.
pub fn qualify(goal: &str, module: &ModuleName) -> String {
    if module.is_default() {
        goal.to_string()
    } else {
        let bare = goal.strip_suffix('.').unwrap_or(goal);
        format!("{}@{}.", bare, module)
    }
}

/// Normalize then qualify.
pub fn module_query(query: &str, module: &ModuleName) -> String {
    qualify(&normalize_query(query), module)
}

/// Append the halt directive so a single-shot run terminates on its own.
pub fn with_halt(directive: &str) -> String {
    format!("{} {}", directive, HALT_DIRECTIVE)
}

/// Quoted atom with embedded single quotes doubled.
pub fn quote_atom(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// `['file'].`, or `['file' >> module].` for a non-default module.
pub fn load_directive(file: &str, module: &ModuleName) -> String {
    if module.is_default() {
        format!("[{}].", quote_atom(file))
    } else {
        format!("[{} >> {}].", quote_atom(file), module)
    }
}

/// Compile without loading into any module.
pub fn compile_directive(file: &str) -> String {
    format!("compile{{{}}}.", quote_atom(file))
}

/// `\help.` or `\help(topic).`; a blank topic means general help.
pub fn help_directive(topic: Option<&str>) -> String {
    match topic.map(str::trim).filter(|t| !t.is_empty()) {
        Some(topic) => format!("\\help({}).", topic),
        None => "\\help.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_appends_one_period() {
        assert_eq!(normalize_query("mortal(?X)"), "mortal(?X).");
        assert_eq!(normalize_query("  mortal(?X).  "), "mortal(?X).");
        let once = normalize_query("man(socrates)");
        assert_eq!(normalize_query(&once), once);
    }

    #[test]
    fn test_qualification() {
        let main = ModuleName::default();
        let family = ModuleName::new("family");

        assert_eq!(module_query("parent(?X, bob)", &main), "parent(?X, bob).");
        assert_eq!(
            module_query("parent(?X, bob).", &family),
            "parent(?X, bob)@family."
        );
        assert!(!module_query("p(?X)", &main).contains('@'));
    }

    #[test]
    fn test_query_command_with_halt() {
        assert_eq!(
            with_halt(&module_query("mortal(socrates).", &ModuleName::default())),
            "mortal(socrates). \\halt."
        );
        assert_eq!(
            with_halt(&module_query("?X : Person", &ModuleName::new("people"))),
            "?X : Person@people. \\halt."
        );
    }

    #[test]
    fn test_load_directives() {
        assert_eq!(
            load_directive("family.ergo", &ModuleName::default()),
            "['family.ergo']."
        );
        assert_eq!(
            load_directive("/tmp/ergo_temp_1_ab.ergo", &ModuleName::new("scratch")),
            "['/tmp/ergo_temp_1_ab.ergo' >> scratch]."
        );
        assert_eq!(
            load_directive("o'brien.ergo", &ModuleName::default()),
            "['o''brien.ergo']."
        );
    }

    #[test]
    fn test_compile_and_help() {
        assert_eq!(
            compile_directive("/tmp/ergo_syntax_1_x.ergo"),
            "compile{'/tmp/ergo_syntax_1_x.ergo'}."
        );
        assert_eq!(help_directive(None), "\\help.");
        assert_eq!(help_directive(Some("  ")), "\\help.");
        assert_eq!(help_directive(Some("load")), "\\help(load).");
    }
}
