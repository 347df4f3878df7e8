//! End-to-end runs of the pipeline over small programs, checking which
//! protocols get selected and what the instantiated processes look like.

use pretty_assertions::assert_eq;
use weir_core::language::{BinaryOperator, Expression, Statement};
use weir_core::{
    compile, compile_with, HostTrustConfiguration, ProcessName, ProcessStatement, Protocol,
    SearchConfiguration,
};
use weir_error::CompileError;
use weir_types::{HostName, Jom, Label, Lattice, Location, Principal, Variable};

fn loc(line: u32) -> Location {
    Location::new(line, 1)
}

fn alice() -> HostName {
    HostName::new("alice")
}

fn bob() -> HostName {
    HostName::new("bob")
}

fn alice_label() -> Label {
    Label::principal(Principal::new("alice"))
}

fn bob_label() -> Label {
    Label::principal(Principal::new("bob"))
}

fn two_hosts() -> HostTrustConfiguration {
    let mut config = HostTrustConfiguration::new();
    config.add_host(alice(), alice_label()).unwrap();
    config.add_host(bob(), bob_label()).unwrap();
    config
}

#[test]
fn either_host_data_lands_on_the_first_declared_host() {
    let config = two_hosts();
    let program = vec![
        Statement::declare("result", alice_label().or(&bob_label()), loc(1)),
        Statement::assign(
            "result",
            Expression::binary(BinaryOperator::Add, Expression::int(1), Expression::int(2)),
            loc(2),
        ),
    ];

    let output = compile(&config, &program).unwrap();
    assert_eq!(
        output.protocol_for(&Variable::new("result")),
        Some(&Protocol::Single { host: alice() })
    );

    let alice_statements = output
        .processes
        .statements(&ProcessName::Host(alice()))
        .unwrap();
    assert_eq!(alice_statements.len(), 3);
    assert_eq!(
        alice_statements[2],
        ProcessStatement::Assign {
            var: Variable::new("result"),
            expr: Expression::read("result_0"),
        }
    );
    assert_eq!(
        output.processes.statements(&ProcessName::Host(bob())),
        Some(&[][..])
    );
}

#[test]
fn jointly_secret_product_runs_under_mpc() {
    let config = two_hosts();
    let program = vec![
        Statement::declare("a", alice_label(), loc(1)),
        Statement::declare("b", bob_label(), loc(2)),
        Statement::declare("product", alice_label().and(&bob_label()), loc(3)),
        Statement::assign("a", Expression::int(3), loc(4)),
        Statement::assign("b", Expression::int(4), loc(5)),
        Statement::assign(
            "product",
            Expression::binary(
                BinaryOperator::Mul,
                Expression::read("a"),
                Expression::read("b"),
            ),
            loc(6),
        ),
    ];

    let output = compile(&config, &program).unwrap();
    assert_eq!(
        output.protocol_for(&Variable::new("product")),
        Some(&Protocol::Mpc {
            parties: [alice(), bob()].into_iter().collect(),
        })
    );

    // Both inputs are fed into the synthesized evaluator process.
    let evaluator = ProcessName::Synthesized("mpc_alice_bob".into());
    let evaluator_statements = output.processes.statements(&evaluator).unwrap();
    assert!(evaluator_statements
        .iter()
        .any(|statement| matches!(statement, ProcessStatement::Receive { from, .. } if *from == ProcessName::Host(alice()))));
    assert!(evaluator_statements
        .iter()
        .any(|statement| matches!(statement, ProcessStatement::Receive { from, .. } if *from == ProcessName::Host(bob()))));
    let alice_statements = output
        .processes
        .statements(&ProcessName::Host(alice()))
        .unwrap();
    assert!(alice_statements
        .iter()
        .any(|statement| matches!(statement, ProcessStatement::Send { to, .. } if *to == evaluator)));
}

#[test]
fn disabling_mpc_leaves_joint_secrets_without_a_protocol() {
    let config = two_hosts();
    let program = vec![
        Statement::declare("a", alice_label(), loc(1)),
        Statement::declare("b", bob_label(), loc(2)),
        Statement::declare("product", alice_label().and(&bob_label()), loc(3)),
        Statement::assign("a", Expression::int(3), loc(4)),
        Statement::assign("b", Expression::int(4), loc(5)),
        Statement::assign(
            "product",
            Expression::binary(
                BinaryOperator::Mul,
                Expression::read("a"),
                Expression::read("b"),
            ),
            loc(6),
        ),
    ];

    let search = SearchConfiguration {
        mpc: false,
        ..SearchConfiguration::default()
    };
    let error = compile_with(&config, &program, &search).unwrap_err();
    match error {
        CompileError::NoProtocolCandidates { location, .. } => assert_eq!(location, loc(3)),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn declassified_comparison_stays_on_the_owning_host() {
    let config = two_hosts();
    let released = Label::new(Jom::one(), Jom::atom(Principal::new("alice")));
    let program = vec![
        Statement::declare("secret", alice_label(), loc(1)),
        Statement::assign("secret", Expression::int(5), loc(2)),
        Statement::declare("matched", released.clone(), loc(3)),
        Statement::assign(
            "matched",
            Expression::declassify(
                released,
                Expression::binary(
                    BinaryOperator::EqualTo,
                    Expression::read("secret"),
                    Expression::int(5),
                ),
            ),
            loc(4),
        ),
    ];

    let output = compile(&config, &program).unwrap();
    assert_eq!(
        output.protocol_for(&Variable::new("matched")),
        Some(&Protocol::Single { host: alice() })
    );
    // Nothing in this program needs more than alice.
    for (_, protocol) in output.assignment.iter() {
        assert_eq!(*protocol, Protocol::Single { host: alice() });
    }
}

#[test]
fn declassification_must_preserve_integrity() {
    let config = two_hosts();
    let program = vec![
        Statement::declare("secret", alice_label(), loc(1)),
        Statement::assign("secret", Expression::int(5), loc(2)),
        Statement::declare("matched", Label::bottom(), loc(3)),
        Statement::assign(
            "matched",
            Expression::declassify(
                Label::bottom(),
                Expression::binary(
                    BinaryOperator::EqualTo,
                    Expression::read("secret"),
                    Expression::int(5),
                ),
            ),
            loc(4),
        ),
    ];

    let error = compile(&config, &program).unwrap_err();
    match error {
        CompileError::LabelViolation { location, .. } => assert_eq!(location, loc(4)),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn branching_on_a_secret_taints_storage_written_under_it() {
    let config = two_hosts();
    let program = vec![
        Statement::declare("cond", alice_label(), loc(1)),
        Statement::assign("cond", Expression::bool(true), loc(2)),
        Statement::declare("out", Label::bottom(), loc(3)),
        Statement::if_else(
            Expression::read("cond"),
            vec![Statement::assign("out", Expression::int(1), loc(5))],
            vec![Statement::assign("out", Expression::int(2), loc(7))],
            loc(4),
        ),
    ];

    let output = compile(&config, &program).unwrap();

    // The implicit flow from the guard raises `out` from public to alice.
    let out = output.pdg.storage_for(&Variable::new("out")).unwrap();
    assert_eq!(*output.labels.label(out), alice_label());
    assert_eq!(
        output.protocol_for(&Variable::new("out")),
        Some(&Protocol::Single { host: alice() })
    );

    let alice_statements = output
        .processes
        .statements(&ProcessName::Host(alice()))
        .unwrap();
    let conditionals: Vec<&ProcessStatement> = alice_statements
        .iter()
        .filter(|statement| matches!(statement, ProcessStatement::If { .. }))
        .collect();
    assert_eq!(conditionals.len(), 1);
    match conditionals[0] {
        ProcessStatement::If {
            then_branch,
            else_branch,
            ..
        } => {
            assert!(!then_branch.is_empty());
            assert!(!else_branch.is_empty());
        }
        _ => unreachable!(),
    }
}

#[test]
fn storage_read_under_a_secret_guard_moves_off_its_host() {
    let config = two_hosts();
    let program = vec![
        Statement::declare("cond", alice_label(), loc(1)),
        Statement::assign("cond", Expression::bool(true), loc(2)),
        Statement::declare("x", bob_label(), loc(3)),
        Statement::assign("x", Expression::int(5), loc(4)),
        Statement::declare("out", bob_label(), loc(5)),
        Statement::if_else(
            Expression::read("cond"),
            vec![Statement::assign("out", Expression::read("x"), loc(7))],
            vec![],
            loc(6),
        ),
    ];

    let output = compile(&config, &program).unwrap();

    // Whoever holds x learns from the replayed branch whether it ran, so
    // x picks up the guard's label even though the branch only reads it.
    let x = output.pdg.storage_for(&Variable::new("x")).unwrap();
    assert_eq!(*output.labels.label(x), bob_label().join(&alice_label()));
    let joint_mpc = Protocol::Mpc {
        parties: [alice(), bob()].into_iter().collect(),
    };
    assert_eq!(output.protocol_for(&Variable::new("x")), Some(&joint_mpc));
    assert_eq!(output.protocol_for(&Variable::new("out")), Some(&joint_mpc));

    // The guard reaches only the joint evaluator; bob alone never sees it.
    assert_eq!(
        output.processes.statements(&ProcessName::Host(bob())),
        Some(&[][..])
    );
}

#[test]
fn jointly_endorsed_data_is_replicated_and_cross_checked_on_read() {
    let config = two_hosts();
    let joint_integrity = Label::new(
        Jom::one(),
        Jom::atom(Principal::new("alice")).meet(&Jom::atom(Principal::new("bob"))),
    );
    let program = vec![
        Statement::declare("x", joint_integrity, loc(1)),
        Statement::assign("x", Expression::int(7), loc(2)),
        Statement::declare("s", alice_label().and(&bob_label()), loc(3)),
        Statement::assign(
            "s",
            Expression::binary(
                BinaryOperator::Mul,
                Expression::read("x"),
                Expression::int(2),
            ),
            loc(4),
        ),
    ];

    let output = compile(&config, &program).unwrap();
    assert_eq!(
        output.protocol_for(&Variable::new("x")),
        Some(&Protocol::Replication {
            replicas: [alice(), bob()].into_iter().collect(),
        })
    );

    // Reading x into the evaluator takes both replicas: each host sends
    // its copy over, and the two are compared before use.
    let evaluator = ProcessName::Synthesized("mpc_alice_bob".into());
    for host in [alice(), bob()] {
        let statements = output
            .processes
            .statements(&ProcessName::Host(host))
            .unwrap();
        assert!(statements
            .iter()
            .any(|statement| matches!(statement, ProcessStatement::Send { to, .. } if *to == evaluator)));
    }
    let evaluator_statements = output.processes.statements(&evaluator).unwrap();
    assert!(evaluator_statements
        .iter()
        .any(|statement| matches!(statement, ProcessStatement::Receive { from, .. } if *from == ProcessName::Host(alice()))));
    assert!(evaluator_statements
        .iter()
        .any(|statement| matches!(statement, ProcessStatement::Receive { from, .. } if *from == ProcessName::Host(bob()))));
    assert!(evaluator_statements
        .iter()
        .any(|statement| matches!(statement, ProcessStatement::AssertEqual { vars } if vars.len() == 2)));
}

#[test]
fn reading_an_undeclared_variable_fails() {
    let config = two_hosts();
    let program = vec![Statement::assign("x", Expression::int(1), loc(1))];
    let error = compile(&config, &program).unwrap_err();
    assert_eq!(
        error,
        CompileError::UndeclaredVariable {
            var: Variable::new("x"),
            location: loc(1),
        }
    );
}

#[test]
fn configurations_pretty_print_one_block_per_process() {
    let config = two_hosts();
    let program = vec![
        Statement::declare("result", alice_label(), loc(1)),
        Statement::assign("result", Expression::int(1), loc(2)),
    ];
    let output = compile(&config, &program).unwrap();
    let printed = output.processes.to_string();
    assert!(printed.contains("process alice {"));
    assert!(printed.contains("process bob {"));
    assert!(printed.contains("var result @"));
}
