//! Behavioural steps for merging definitions across sources.
#![expect(clippy::expect_used, reason = "simplify test failure output")]

use cucumber::gherkin::Step;
use cucumber::{World, given, then, when};
use std::path::PathBuf;

use netplan_lib::{DefinitionStore, ParseError, Parser};

#[derive(Debug, Default, World)]
pub struct MergeWorld {
    sources: Vec<(PathBuf, String)>,
    result: Option<Result<DefinitionStore, ParseError>>,
}

impl MergeWorld {
    fn store(&self) -> &DefinitionStore {
        match &self.result {
            Some(Ok(store)) => store,
            other => panic!("expected parsed store, got {other:?}"),
        }
    }
}

#[given(regex = r#"^a source "(.+)" with$"#)]
fn a_source_with(world: &mut MergeWorld, name: String, step: &Step) {
    let text = step.docstring.clone().expect("docstring");
    world.sources.push((PathBuf::from(name), text));
}

#[when("the sources are parsed in order")]
fn parse_in_order(world: &mut MergeWorld) {
    let mut parser = Parser::new();
    let parsed = world
        .sources
        .iter()
        .try_for_each(|(origin, text)| parser.parse_str(origin, text));
    world.result = Some(parsed.and_then(|()| parser.finish()));
}

#[then(regex = r#"^definition "(.+)" has setting "(.+)"$"#)]
fn has_setting(world: &mut MergeWorld, id: String, key: String) {
    let def = world.store().get(&id).expect("definition present");
    assert!(def.setting(&key).is_some(), "{id} lacks {key}");
}

#[then(regex = r#"^definition "(.+)" is rendered by "(.+)"$"#)]
fn rendered_by(world: &mut MergeWorld, id: String, renderer: String) {
    let def = world.store().get(&id).expect("definition present");
    assert_eq!(def.backend.as_str(), renderer);
}

#[then(regex = r#"^parsing fails mentioning "(.+)"$"#)]
fn parsing_fails(world: &mut MergeWorld, needle: String) {
    match world.result.take() {
        Some(Err(e)) => assert!(e.to_string().contains(&needle), "{e}"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[then(regex = r"^there are (\d+) global routes$")]
fn global_routes(world: &mut MergeWorld, count: usize) {
    assert_eq!(world.store().routes().len(), count);
}
