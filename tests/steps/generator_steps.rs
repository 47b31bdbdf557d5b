//! Behavioural steps for generator-mode runs.
#![expect(clippy::expect_used, reason = "simplify test failure output")]

use cucumber::{World, given, then, when};

use netplan_generate::pipeline::{self, GenerateError, Outcome};
use netplan_generate::sources::Tier;
use netplan_generate::stamp::STAMP_NAME;
use test_support::{ConfigTree, RecordingServices};

#[derive(Debug, Default, World)]
pub struct GeneratorWorld {
    tree: ConfigTree,
    services: RecordingServices,
    result: Option<Result<Outcome, GenerateError>>,
}

fn unit(id: &str) -> String {
    format!("run/systemd/network/10-netplan-{id}.network")
}

fn dhcp_source(id: &str) -> String {
    format!("network:\n  version: 2\n  ethernets:\n    {id}:\n      dhcp4: true\n")
}

#[given(regex = r#"^an? (etc|run|lib) source "(.+)" configuring "(.+)" with dhcp$"#)]
fn tier_source(world: &mut GeneratorWorld, tier: String, name: String, id: String) {
    let tier = match tier.as_str() {
        "lib" => Tier::Lib,
        "etc" => Tier::Etc,
        _ => Tier::Run,
    };
    world.tree.source(tier, &name, &dhcp_source(&id));
}

#[given("the generator has already run")]
fn already_ran(world: &mut GeneratorWorld) {
    pipeline::run(&world.tree.generator(), &RecordingServices::new()).expect("first run");
}

#[when(regex = r#"^networkd output for "(.+)" is deleted$"#)]
fn delete_output(world: &mut GeneratorWorld, id: String) {
    std::fs::remove_file(world.tree.root().join(unit(&id))).expect("remove unit");
}

#[when("the generator runs")]
fn generator_runs(world: &mut GeneratorWorld) {
    let invocation = world.tree.generator();
    world.result = Some(pipeline::run(&invocation, &world.services));
}

#[then(regex = r#"^networkd output exists for "(.+)"$"#)]
fn output_exists(world: &mut GeneratorWorld, id: String) {
    assert!(world.tree.exists(&unit(&id)), "missing unit for {id}");
}

#[then(regex = r#"^networkd output is absent for "(.+)"$"#)]
fn output_absent(world: &mut GeneratorWorld, id: String) {
    assert!(!world.tree.exists(&unit(&id)), "unexpected unit for {id}");
}

#[then("networkd was enabled")]
fn networkd_enabled(world: &mut GeneratorWorld) {
    let [normal, _, _] = world.tree.generator_dirs();
    assert_eq!(world.services.enabled(), vec![normal]);
}

#[then("the run stamp exists")]
fn stamp_exists(world: &mut GeneratorWorld) {
    let [normal, _, _] = world.tree.generator_dirs();
    assert!(normal.join(STAMP_NAME).exists());
}

#[then("the run was skipped")]
fn run_skipped(world: &mut GeneratorWorld) {
    match world.result.take() {
        Some(Ok(Outcome::AlreadyRan { stamp })) => assert!(stamp.ends_with(STAMP_NAME)),
        other => panic!("expected skipped run, got {other:?}"),
    }
}

#[then("no service was touched")]
fn untouched(world: &mut GeneratorWorld) {
    assert!(world.services.untouched());
}
