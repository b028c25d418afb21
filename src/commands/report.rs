//! The `totals`, `matrix` and `balances` reports. Each one is a single walk over the store with
//! one or more reducers, rendered as a table.

use super::{money, span, Out, Session, Table};
use crate::args::{BalancesArgs, MatrixArgs, TotalsArgs};
use crate::model::OpType;
use crate::predicate::Predicate;
use crate::reducers::{AccountBalances, OperationCounter, Totals, YearMonthMatrix};
use crate::walker::calculate;
use crate::Result;
use chrono::Month;
use tracing::debug;

/// A running total of the matching operations, one row per interval of the chosen granularity.
pub async fn totals(session: &Session, args: &TotalsArgs) -> Result<Out<Table>> {
    let span = span(args.span().from(), args.span().to())?;
    let predicate = session.predicate(args.filter(), None)?;
    let currency = session.master_currency();

    let mut totals = Totals::new(session.rates().clone(), currency);
    let mut counter = OperationCounter::new();
    let stats = calculate(
        session.store().operations()?,
        span,
        &predicate,
        session.today(),
        &mut [&mut totals, &mut counter],
    )
    .await;
    debug!("Totals run: {stats:?}");

    let mut table = Table::new(["date", "change", "total"]);
    for point in totals.series().get(args.granularity()) {
        table.push(vec![
            point.date.to_string(),
            money(point.change),
            money(point.total),
        ]);
    }

    let breakdown = OpType::ALL
        .iter()
        .filter_map(|t| match counter.count(*t) {
            0 => None,
            n => Some(format!("{n} {t}")),
        })
        .collect::<Vec<_>>()
        .join(", ");
    let message = format!(
        "{} operations ({}) over {} days, total {} {}",
        counter.total(),
        if breakdown.is_empty() { "none" } else { breakdown.as_str() },
        stats.days,
        money(totals.series().total()),
        currency
    );
    Ok(Out::new(message, table))
}

/// Spending per month, one column per year.
pub async fn matrix(session: &Session, args: &MatrixArgs) -> Result<Out<Table>> {
    let span = span(args.span().from(), args.span().to())?;
    let predicate = session.predicate(args.filter(), Some(Predicate::expense()))?;
    let currency = session.master_currency();

    let mut matrix = YearMonthMatrix::new(session.rates().clone(), currency);
    let stats = calculate(
        session.store().operations()?,
        span,
        &predicate,
        session.today(),
        &mut [&mut matrix],
    )
    .await;

    let mut table = Table::new(
        std::iter::once("month".to_string()).chain(matrix.years().iter().map(i32::to_string)),
    );
    for (month, values) in matrix.rows() {
        let name = u8::try_from(month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name().to_string())
            .unwrap_or_else(|| month.to_string());
        let mut row = vec![name];
        row.extend(values.iter().copied().map(money));
        table.push(row);
    }

    let message = format!(
        "Spending in {currency} from {} operations over {} years",
        stats.processed,
        matrix.years().len()
    );
    Ok(Out::new(message, table))
}

/// Every live account's balance in the master currency, plus their sum, one row per interval.
pub async fn balances(session: &Session, args: &BalancesArgs) -> Result<Out<Table>> {
    let span = span(args.span().from(), args.span().to())?;
    let store = session.store();
    let operations = store.operations()?;
    let currency = session.master_currency();
    let predicate = Predicate::any().compile(store)?;

    let accounts = store.accounts()?.filter(|a| !a.deleted);
    let mut balances = AccountBalances::new(session.rates().clone(), currency, accounts)
        .with_history(operations, span.start);
    calculate(
        operations,
        span,
        &predicate,
        session.today(),
        &mut [&mut balances],
    )
    .await;

    let mut headers = vec!["date".to_string()];
    for balance in balances.accounts() {
        headers.push(store.account(&balance.id)?.name.clone());
    }
    headers.push("total".to_string());
    let mut table = Table::new(headers);

    let granularity = args.granularity();
    for (ix, point) in balances.total().get(granularity).iter().enumerate() {
        let mut row = vec![point.date.to_string()];
        for balance in balances.accounts() {
            let total = balance
                .converted
                .get(granularity)
                .get(ix)
                .map(|p| p.total)
                .unwrap_or_default();
            row.push(money(total));
        }
        row.push(money(point.total));
        table.push(row);
    }

    let message = format!(
        "{} accounts, {} {} in total",
        balances.accounts().count(),
        money(balances.total().total()),
        currency
    );
    Ok(Out::new(message, table))
}
