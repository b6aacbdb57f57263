use dses_core::ledger::keys::{call_time_key, BUY_RECORD_PREFIX, REDUCE_RECORD_PREFIX};
use dses_core::ledger::MemoryLedger;
use dses_core::services::calltime;
use dses_core::{
    Amount, BuyRecord, CallTimeAccount, Commands, EconomyPolicy, ErrorKind, LedgerError,
    ReduceRecord, User,
};

const TOKEN: &str = "TOKENS";

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

fn account(bytes: &[u8]) -> CallTimeAccount {
    serde_json::from_slice(bytes).expect("account json")
}

/// alice publishes weatherApi at price 5; bob is registered and funded.
fn weather_market() -> (MemoryLedger, Commands) {
    let mut ledger = MemoryLedger::new();
    let cmds = Commands::default();
    call(&mut ledger, &cmds, "addr-alice", "registerUser", &["alice", "dev"]).unwrap();
    call(&mut ledger, &cmds, "addr-bob", "registerUser", &["bob", "buyer"]).unwrap();
    call(
        &mut ledger,
        &cmds,
        "addr-alice",
        "registerService",
        &["weatherApi", "rest", "forecasts", "alice", "https://w.example", "5"],
    )
    .unwrap();
    call(&mut ledger, &cmds, "addr-alice", "publishService", &["weatherApi"]).unwrap();
    ledger.fund("addr-bob", TOKEN, Amount::from(100));
    (ledger, cmds)
}

#[test]
fn purchase_then_reduce_end_to_end() -> anyhow::Result<()> {
    let (mut ledger, cmds) = weather_market();

    let bought = account(&call(&mut ledger, &cmds, "addr-bob", "callService", &["weatherApi", "3"])?);
    assert_eq!(bought.call_times, Amount::from(3));
    assert_eq!(bought.total, Amount::from(15));
    assert_eq!(bought.user_name, "bob");
    assert_eq!(bought.user_address, "addr-bob");

    // A single unit price moves, whatever the quantity.
    assert_eq!(ledger.transfers().len(), 1);
    assert_eq!(ledger.transfers()[0].amount, Amount::from(5));
    assert_eq!(ledger.balance("addr-alice", TOKEN), Amount::from(5));
    assert_eq!(ledger.balance("addr-bob", TOKEN), Amount::from(95));

    let reduced = account(&call(
        &mut ledger,
        &cmds,
        "addr-alice",
        "reduceCallTime",
        &["weatherApi", "bob", "2"],
    )?);
    assert_eq!(reduced.call_times, Amount::from(1));
    assert_eq!(reduced.total, Amount::from(15));
    assert!(reduced.update_time > reduced.create_time);

    let bob: User = serde_json::from_slice(&call(&mut ledger, &cmds, "x", "queryUser", &["bob"])?)?;
    assert_eq!(bob.total_call_times, Amount::from(3));
    let alice: User = serde_json::from_slice(&call(&mut ledger, &cmds, "x", "queryUser", &["alice"])?)?;
    assert_eq!(alice.total_invoke_times, Amount::from(2));
    // s = 1, v = 2, c = 0
    assert!((alice.contribution - (2f64.ln() + 4.0)).abs() < 1e-12);

    let buys = ledger.keys_with_prefix(BUY_RECORD_PREFIX);
    assert_eq!(buys.len(), 1);
    let buy: BuyRecord = serde_json::from_slice(ledger.raw(&buys[0]).unwrap())?;
    assert_eq!(buy.call_time, Amount::from(3));
    assert_eq!(buy.total, Amount::from(15));
    assert_eq!(buy.service_call_time_key, call_time_key("weatherApi", "bob")?);

    let reduces = ledger.keys_with_prefix(REDUCE_RECORD_PREFIX);
    assert_eq!(reduces.len(), 1);
    let red: ReduceRecord = serde_json::from_slice(ledger.raw(&reduces[0]).unwrap())?;
    assert_eq!(red.user_name, "alice");
    assert_eq!(red.reduce_time, Amount::from(2));
    Ok(())
}

#[test]
fn repeat_purchases_accumulate() -> anyhow::Result<()> {
    let (mut ledger, cmds) = weather_market();
    call(&mut ledger, &cmds, "addr-bob", "callService", &["weatherApi", "3"])?;
    let acct = account(&call(&mut ledger, &cmds, "addr-bob", "callService", &["weatherApi", "4"])?);
    assert_eq!(acct.call_times, Amount::from(7));
    assert_eq!(acct.total, Amount::from(35));
    assert!(acct.update_time > acct.create_time);
    assert_eq!(ledger.keys_with_prefix(BUY_RECORD_PREFIX).len(), 2);
    assert_eq!(ledger.balance("addr-alice", TOKEN), Amount::from(10));
    Ok(())
}

#[test]
fn same_second_audit_records_do_not_overwrite() -> anyhow::Result<()> {
    let (mut ledger, _) = weather_market();
    let policy = EconomyPolicy::default();
    ledger.invoke("addr-bob", |inv| {
        calltime::purchase(inv, &policy, "weatherApi", "1")?;
        calltime::purchase(inv, &policy, "weatherApi", "2")
    })?;
    let buys = ledger.keys_with_prefix(BUY_RECORD_PREFIX);
    assert_eq!(buys.len(), 2);
    let units: Vec<Amount> = buys
        .iter()
        .map(|k| serde_json::from_slice::<BuyRecord>(ledger.raw(k).unwrap()).unwrap().call_time)
        .collect();
    assert!(units.contains(&Amount::from(1)));
    assert!(units.contains(&Amount::from(2)));
    Ok(())
}

#[test]
fn huge_quantities_stay_exact() -> anyhow::Result<()> {
    let (mut ledger, cmds) = weather_market();
    let units = "340282366920938463463374607431768211455"; // u128::MAX
    let acct = account(&call(&mut ledger, &cmds, "addr-bob", "callService", &["weatherApi", units])?);
    assert_eq!(acct.total.to_string(), "1701411834604692317316873037158841057275");
    Ok(())
}

#[test]
fn purchase_requires_available_service() {
    let (mut ledger, cmds) = weather_market();
    call(&mut ledger, &cmds, "addr-alice", "invalidateService", &["weatherApi"]).unwrap();
    let err = call(&mut ledger, &cmds, "addr-bob", "callService", &["weatherApi", "1"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let missing = call(&mut ledger, &cmds, "addr-bob", "callService", &["nope", "1"]).unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}

#[test]
fn purchase_rejects_bad_units_and_strangers() {
    let (mut ledger, cmds) = weather_market();
    for units in ["0", "-1", "1.5", "many"] {
        let err = call(&mut ledger, &cmds, "addr-bob", "callService", &["weatherApi", units]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "units {units}");
    }
    let err = call(&mut ledger, &cmds, "addr-stranger", "callService", &["weatherApi", "1"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn unfunded_buyer_gets_nothing() {
    let (mut ledger, cmds) = weather_market();
    call(&mut ledger, &cmds, "addr-carol", "registerUser", &["carol", ""]).unwrap();
    let err = call(&mut ledger, &cmds, "addr-carol", "callService", &["weatherApi", "2"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransferFailed);
    let lookup = call(&mut ledger, &cmds, "x", "getCallTime", &["weatherApi", "carol"]).unwrap_err();
    assert_eq!(lookup.kind(), ErrorKind::NotFound);
    assert!(ledger.keys_with_prefix(BUY_RECORD_PREFIX).is_empty());
}

#[test]
fn reduce_guards() -> anyhow::Result<()> {
    let (mut ledger, cmds) = weather_market();
    call(&mut ledger, &cmds, "addr-bob", "callService", &["weatherApi", "3"])?;

    // Only the developer reduces.
    let err = call(&mut ledger, &cmds, "addr-bob", "reduceCallTime", &["weatherApi", "bob", "1"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let err = call(&mut ledger, &cmds, "addr-alice", "reduceCallTime", &["weatherApi", "bob", "4"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
    let left = account(&call(&mut ledger, &cmds, "x", "getCallTime", &["weatherApi", "bob"])?);
    assert_eq!(left.call_times, Amount::from(3));

    let err = call(&mut ledger, &cmds, "addr-alice", "reduceCallTime", &["weatherApi", "carol", "1"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = call(&mut ledger, &cmds, "addr-alice", "reduceCallTime", &["weatherApi", "bob", "0"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    // Draining to zero is fine; one more is not.
    call(&mut ledger, &cmds, "addr-alice", "reduceCallTime", &["weatherApi", "bob", "3"])?;
    let err = call(&mut ledger, &cmds, "addr-alice", "reduceCallTime", &["weatherApi", "bob", "1"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
    assert_eq!(ledger.keys_with_prefix(REDUCE_RECORD_PREFIX).len(), 1);
    Ok(())
}

#[test]
fn blank_names_are_invalid_arguments() -> anyhow::Result<()> {
    let (mut ledger, cmds) = weather_market();
    call(&mut ledger, &cmds, "addr-bob", "callService", &["weatherApi", "3"])?;

    let cases: [(&str, &str, &[&str]); 6] = [
        ("addr-bob", "callService", &[" ", "1"]),
        ("x", "getCallTime", &["weatherApi", " "]),
        ("x", "getCallTime", &["", "bob"]),
        ("x", "getCallTimes", &[" "]),
        ("addr-alice", "reduceCallTime", &["weatherApi", "", "1"]),
        ("addr-alice", "reduceCallTime", &["", "bob", "1"]),
    ];
    for (caller, function, args) in cases {
        let err = call(&mut ledger, &cmds, caller, function, args).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{function} {args:?}");
    }

    let left = account(&call(&mut ledger, &cmds, "x", "getCallTime", &["weatherApi", "bob"])?);
    assert_eq!(left.call_times, Amount::from(3));
    Ok(())
}

#[test]
fn accounts_are_listed_per_service() -> anyhow::Result<()> {
    let (mut ledger, cmds) = weather_market();
    call(&mut ledger, &cmds, "addr-carol", "registerUser", &["carol", ""])?;
    ledger.fund("addr-carol", TOKEN, Amount::from(5));
    call(&mut ledger, &cmds, "addr-bob", "callService", &["weatherApi", "3"])?;
    call(&mut ledger, &cmds, "addr-carol", "callService", &["weatherApi", "1"])?;

    let listed: Vec<CallTimeAccount> =
        serde_json::from_slice(&call(&mut ledger, &cmds, "x", "getCallTimes", &["weatherApi"])?)?;
    let holders: Vec<&str> = listed.iter().map(|a| a.user_name.as_str()).collect();
    assert_eq!(holders, vec!["bob", "carol"]);

    let one = account(&call(&mut ledger, &cmds, "x", "getCallTime", &["weatherApi", "carol"])?);
    assert_eq!(one.call_times, Amount::from(1));

    let none: Vec<CallTimeAccount> =
        serde_json::from_slice(&call(&mut ledger, &cmds, "x", "getCallTimes", &["mapApi"])?)?;
    assert!(none.is_empty());
    Ok(())
}
