use super::{Out, Session, Table};
use crate::args::RateArgs;
use crate::Result;

/// Looks up the rate that converts one unit of `from` into `to`. Without a date, today's rate is
/// used.
pub async fn rate(session: &Session, args: &RateArgs) -> Result<Out<Table>> {
    let date = args.date().unwrap_or_else(|| session.today());
    let from = args.from().trim().to_uppercase();
    let to = args.to().trim().to_uppercase();
    if from.is_empty() || to.is_empty() {
        let e = anyhow::anyhow!("Both currencies are required");
        return Err(e.into());
    }

    let rate = session.rates().get_rate(date, &from, &to).await;
    let mut table = Table::new(["date", "from", "to", "rate"]);
    table.push(vec![
        date.to_string(),
        from.clone(),
        to.clone(),
        rate.to_string(),
    ]);
    Ok(Out::new(format!("1 {from} = {rate} {to} on {date}"), table))
}
