use super::{Out, Session, Table};
use crate::ranking::UsageRanking;
use crate::Result;

/// Lists accounts, categories, currencies and tags from most to least used.
pub async fn usage(session: &Session) -> Result<Out<Table>> {
    let store = session.store();
    let ranking = UsageRanking::build(store)?;
    let mut table = Table::new(["kind", "rank", "key", "name"]);

    let mut push = |kind: &str, ix: usize, key: &str, name: &str| {
        table.push(vec![
            kind.to_string(),
            (ix + 1).to_string(),
            key.to_string(),
            name.to_string(),
        ])
    };
    for (ix, id) in ranking.accounts.iter().enumerate() {
        push("account", ix, id, &store.account(id)?.name);
    }
    for (ix, id) in ranking.categories.iter().enumerate() {
        push("category", ix, id, &store.category(id)?.name);
    }
    for (ix, code) in ranking.currencies.iter().enumerate() {
        push("currency", ix, code, code);
    }
    for (ix, tag) in ranking.tags.iter().enumerate() {
        push("tag", ix, tag, tag);
    }

    let message = format!(
        "Ranked {} accounts, {} categories, {} currencies and {} tags",
        ranking.accounts.len(),
        ranking.categories.len(),
        ranking.currencies.len(),
        ranking.tags.len()
    );
    Ok(Out::new(message, table))
}
