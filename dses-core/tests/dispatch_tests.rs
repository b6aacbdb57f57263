use dses_core::commands::function;
use dses_core::config::CoreConfig;
use dses_core::ledger::keys::user_key;
use dses_core::ledger::{MemoryLedger, TransferRecord};
use dses_core::{Amount, Commands, ErrorKind, LedgerError, User};

fn call(
    ledger: &mut MemoryLedger,
    cmds: &Commands,
    caller: &str,
    function: &str,
    args: &[&str],
) -> Result<Vec<u8>, LedgerError> {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    ledger.invoke(caller, |inv| cmds.invoke(inv, function, &args))
}

#[test]
fn unknown_function_is_invalid_argument() {
    let mut ledger = MemoryLedger::new();
    let err = call(&mut ledger, &Commands::default(), "a", "deleteEverything", &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn wrong_arity_is_rejected_before_any_work() {
    let mut ledger = MemoryLedger::new();
    let cmds = Commands::default();
    let cases: &[(&str, &[&str])] = &[
        (function::REGISTER_USER, &["only-name"]),
        (function::REGISTER_USER, &["a", "b", "c"]),
        (function::QUERY_USER, &[]),
        (function::REGISTER_SERVICE, &["n", "t", "d", "dev", "r"]),
        (function::EDIT_SERVICE, &["n", "t", "d", "r"]),
        (function::CREATE_MASHUP, &["n", "t", "d", "dev", "1"]),
        (function::QUERY_SERVICE_BY_USER, &["1", "5"]),
        (function::REDUCE_CALL_TIME, &["svc", "user"]),
    ];
    for (f, args) in cases {
        let err = call(&mut ledger, &cmds, "a", f, args).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{f} with {} args", args.len());
    }
    // Nothing got written by the rejected calls.
    assert!(ledger.keys_with_prefix("").is_empty());
}

#[test]
fn arguments_are_trimmed() -> anyhow::Result<()> {
    let mut ledger = MemoryLedger::new();
    let cmds = Commands::default();
    call(&mut ledger, &cmds, "addr-alice", "registerUser", &["  alice ", " hi "])?;
    assert!(ledger.raw(&user_key("alice")).is_some());
    let u: User = serde_json::from_slice(&call(&mut ledger, &cmds, "x", "queryUser", &["alice  "])?)?;
    assert_eq!(u.introduction, "hi");
    Ok(())
}

#[test]
fn reward_pays_the_developer_in_any_token() -> anyhow::Result<()> {
    let mut ledger = MemoryLedger::new();
    let cmds = Commands::default();
    call(&mut ledger, &cmds, "addr-alice", "registerUser", &["alice", ""])?;
    call(
        &mut ledger,
        &cmds,
        "addr-alice",
        "registerService",
        &["weatherApi", "rest", "", "alice", "https://w.example", "5"],
    )?;
    ledger.fund("addr-fan", "GEMS", Amount::from(50));

    // No registration needed to reward.
    let out = call(&mut ledger, &cmds, "addr-fan", "rewardService", &["weatherApi", "GEMS", "20"])?;
    let record: TransferRecord = serde_json::from_slice(&out)?;
    assert_eq!(record.from, "addr-fan");
    assert_eq!(record.to, "addr-alice");
    assert_eq!(record.amount, Amount::from(20));
    assert_eq!(ledger.balance("addr-alice", "GEMS"), Amount::from(20));

    let err = call(&mut ledger, &cmds, "addr-fan", "rewardService", &["weatherApi", "GEMS", "-1"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = call(&mut ledger, &cmds, "addr-fan", "rewardService", &["weatherApi", " ", "1"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = call(&mut ledger, &cmds, "addr-fan", "rewardService", &[" ", "GEMS", "1"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = call(&mut ledger, &cmds, "addr-fan", "rewardService", &["ghost", "GEMS", "1"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = call(&mut ledger, &cmds, "addr-fan", "rewardService", &["weatherApi", "GEMS", "31"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransferFailed);
    Ok(())
}

#[test]
fn configured_incentive_and_token_are_used() -> anyhow::Result<()> {
    let cfg = CoreConfig::from_toml_str(
        r#"
        [economy]
        incentive_amount = "3"
        fee_token = "INK"
        "#,
    )?;
    let cmds = Commands::new(cfg.policy()?);
    let mut ledger = MemoryLedger::new();
    call(&mut ledger, &cmds, "addr-alice", "registerUser", &["alice", ""])?;
    call(&mut ledger, &cmds, "addr-carol", "registerUser", &["carol", ""])?;
    call(
        &mut ledger,
        &cmds,
        "addr-alice",
        "registerService",
        &["weatherApi", "rest", "", "alice", "https://w.example", "5"],
    )?;
    ledger.fund("addr-carol", "INK", Amount::from(3));
    call(
        &mut ledger,
        &cmds,
        "addr-carol",
        "createMashup",
        &["trip", "mashup", "", "carol", "0", "weatherApi"],
    )?;
    assert_eq!(ledger.balance("addr-alice", "INK"), Amount::from(3));
    assert_eq!(ledger.balance("addr-carol", "INK"), Amount::zero());
    Ok(())
}
