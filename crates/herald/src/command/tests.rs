//! Unit tests for command registration and path resolution.

use rstest::{fixture, rstest};

use super::*;

fn noop(name: &str) -> CommandSpec {
    CommandSpec::new(name).handler(|_ctx| Ok(()))
}

fn words(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

fn name_of(tree: &CommandTree, resolved: &Resolved<'_>) -> String {
    tree.spec(resolved.spec)
        .map(|spec| spec.name().to_owned())
        .unwrap_or_default()
}

/// Root with `echo`, `give`/`g`, and a `note` group holding `add` and
/// `list` (the default).
#[fixture]
fn tree() -> CommandTree {
    let mut tree = CommandTree::new();
    tree.register(TreeId::ROOT, noop("echo")).expect("echo");
    tree.register(TreeId::ROOT, noop("give").alias("g"))
        .expect("give");
    let notes = tree.create_child();
    tree.register(notes, noop("add")).expect("note add");
    tree.register(notes, noop("list")).expect("note list");
    tree.set_default(notes, "list").expect("default");
    tree.register(TreeId::ROOT, CommandSpec::new("note").children(notes))
        .expect("note");
    tree
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[rstest]
#[case::same_name("echo")]
#[case::different_case("ECHO")]
#[case::alias_collision("G")]
fn duplicate_names_are_rejected(mut tree: CommandTree, #[case] name: &str) {
    let err = tree
        .register(TreeId::ROOT, noop(name))
        .expect_err("name taken");
    assert_eq!(err, RegistrationError::Duplicate { name: name.into() });
}

#[rstest]
fn alias_equal_to_own_name_is_rejected() {
    let mut tree = CommandTree::new();
    let err = tree
        .register(TreeId::ROOT, noop("kick").alias("Kick"))
        .expect_err("self collision");
    assert!(matches!(err, RegistrationError::Duplicate { .. }));
}

#[rstest]
fn same_name_is_fine_on_another_level(mut tree: CommandTree) {
    let other = tree.create_child();
    assert!(tree.register(other, noop("echo")).is_ok());
}

#[rstest]
#[case::blank("")]
#[case::spaced("two words")]
fn invalid_names_are_rejected(#[case] name: &str) {
    let err = CommandTree::new()
        .register(TreeId::ROOT, noop(name))
        .expect_err("bad name");
    assert!(matches!(err, RegistrationError::InvalidName { .. }));
}

#[rstest]
fn inverted_bounds_are_rejected() {
    let err = CommandTree::new()
        .register(TreeId::ROOT, noop("pick").min_args(3).max_args(1))
        .expect_err("min above max");
    assert_eq!(
        err,
        RegistrationError::InvalidBounds {
            command: "pick".into(),
            min: 3,
            max: 1
        }
    );
}

#[rstest]
fn equal_bounds_are_accepted() {
    let mut tree = CommandTree::new();
    assert!(tree
        .register(TreeId::ROOT, noop("pair").min_args(2).max_args(2))
        .is_ok());
}

#[rstest]
fn spec_without_handler_or_children_is_rejected() {
    let err = CommandTree::new()
        .register(TreeId::ROOT, CommandSpec::new("idle"))
        .expect_err("nothing to run");
    assert!(matches!(err, RegistrationError::MissingHandler { .. }));
}

#[rstest]
fn unknown_trees_are_rejected(mut tree: CommandTree) {
    let bogus = {
        let mut scratch = CommandTree::new();
        scratch.create_child();
        scratch.create_child();
        scratch.create_child();
        scratch.create_child()
    };
    assert_eq!(
        tree.register(bogus, noop("x")),
        Err(RegistrationError::UnknownTree { tree: 4 })
    );
    assert_eq!(
        tree.register(TreeId::ROOT, CommandSpec::new("y").children(bogus)),
        Err(RegistrationError::UnknownTree { tree: 4 })
    );
}

#[rstest]
fn default_must_exist_at_that_level(mut tree: CommandTree) {
    assert_eq!(
        tree.set_default(TreeId::ROOT, "list"),
        Err(RegistrationError::UnknownDefault {
            name: "list".into()
        })
    );
}

#[rstest]
fn commands_are_listed_in_registration_order(tree: CommandTree) {
    let names: Vec<&str> = tree.commands(TreeId::ROOT).map(CommandSpec::name).collect();
    assert_eq!(names, ["echo", "give", "note"]);
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[rstest]
#[case::name("echo hello world", "echo", "echo", 1)]
#[case::upper_case("ECHO hi", "echo", "ECHO", 1)]
#[case::alias("g diamond", "give", "g", 1)]
#[case::no_arguments("echo", "echo", "echo", 1)]
#[case::sub_command("note add buy milk", "add", "add", 2)]
#[case::sub_command_case("NOTE Add x", "add", "Add", 2)]
fn resolves_command_paths(
    tree: CommandTree,
    #[case] line: &str,
    #[case] expected: &str,
    #[case] label: &str,
    #[case] consumed: usize,
) {
    let tokens = words(line);
    let resolved = tree.resolve(&tokens).expect("resolves");
    assert_eq!(name_of(&tree, &resolved), expected);
    assert_eq!(resolved.label, label);
    assert_eq!(resolved.consumed, consumed);
}

#[rstest]
fn tokens_match_whole_names_only(tree: CommandTree) {
    let tokens = ["note", "buy milk"];
    assert_eq!(
        tree.resolve(&tokens),
        Err(ResolutionError::NotFound {
            path: "note".into(),
            word: "buy milk".into()
        })
    );
}

#[rstest]
fn exhausted_input_uses_level_default(tree: CommandTree) {
    let resolved = tree.resolve(&["note"]).expect("default");
    assert_eq!(name_of(&tree, &resolved), "list");
    assert_eq!(resolved.label, "list");
    assert_eq!(resolved.consumed, 1);
}

#[rstest]
fn exhausted_input_falls_back_to_runnable_parent() {
    let mut tree = CommandTree::new();
    let sub = tree.create_child();
    tree.register(sub, noop("reset")).expect("reset");
    tree.register(TreeId::ROOT, noop("config").children(sub))
        .expect("config");

    let resolved = tree.resolve(&["config"]).expect("parent runs");
    assert_eq!(name_of(&tree, &resolved), "config");
    assert_eq!(resolved.consumed, 1);
}

#[rstest]
#[case::unknown_root("nope", "", "nope")]
#[case::unknown_child("note remove 1", "note", "remove")]
fn unmatched_words_fail_resolution(
    tree: CommandTree,
    #[case] line: &str,
    #[case] path: &str,
    #[case] word: &str,
) {
    assert_eq!(
        tree.resolve(&words(line)),
        Err(ResolutionError::NotFound {
            path: path.into(),
            word: word.into()
        })
    );
}

#[rstest]
fn group_without_default_or_handler_is_incomplete() {
    let mut tree = CommandTree::new();
    let sub = tree.create_child();
    tree.register(sub, noop("start")).expect("start");
    tree.register(TreeId::ROOT, CommandSpec::new("server").children(sub))
        .expect("server");

    let err = tree.resolve(&["server"]).expect_err("needs a sub-command");
    assert_eq!(
        err,
        ResolutionError::Incomplete {
            path: "server".into()
        }
    );
    assert_eq!(err.subject(), "server");
}

#[rstest]
fn empty_input_without_root_default_is_incomplete(tree: CommandTree) {
    let tokens: [&str; 0] = [];
    assert_eq!(
        tree.resolve(&tokens),
        Err(ResolutionError::Incomplete { path: String::new() })
    );
}

#[rstest]
fn deep_nesting_resolves_iteratively() {
    let mut tree = CommandTree::new();
    let mut parent = TreeId::ROOT;
    let depth = 200;
    for _ in 0..depth {
        let child = tree.create_child();
        tree.register(parent, CommandSpec::new("deeper").children(child))
            .expect("level");
        parent = child;
    }
    tree.register(parent, noop("bottom")).expect("leaf");

    let line = format!("{}bottom now", "deeper ".repeat(depth));
    let tokens = words(&line);
    let resolved = tree.resolve(&tokens).expect("resolves");
    assert_eq!(name_of(&tree, &resolved), "bottom");
    assert_eq!(resolved.consumed, depth + 1);
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[test]
fn arguments_expose_raw_and_typed_views() {
    use crate::convert::Value;

    let raw = Arguments::Raw(vec!["a".into(), "b".into()]);
    assert_eq!(raw.len(), 2);
    assert_eq!(raw.text(1), Some("b"));
    assert_eq!(raw.value(0), None);

    let typed = Arguments::Typed(vec![Some(Value::Integer(3)), None]);
    assert_eq!(typed.value(0), Some(&Value::Integer(3)));
    assert_eq!(typed.value(1), None);
    assert_eq!(typed.text(0), None);
    assert!(!typed.is_empty());
}

#[test]
fn spec_defaults_allow_everyone() {
    let spec = noop("open");
    assert!(spec.players_allowed());
    assert!(spec.console_allowed());
    assert!(!spec.is_operator_only());
    assert_eq!(spec.min(), None);
    assert_eq!(spec.max(), None);
    assert_eq!(spec.usage_text(), "open");
    assert!(!spec.is_typed());
}
