/// Database models and their repository operations
///
/// # Models
///
/// - `user`: accounts (credential store)
/// - `member`: household members
/// - `chore`: recurring chores with a frequency label
/// - `assignment`: a member bound to a chore on a date, with a completion flag
///
/// `fields` holds the shared field-spec / partial-update machinery and
/// `error` the repository error taxonomy.
///
/// # Example
///
/// ```no_run
/// use chores_shared::db::pool::{create_pool, DatabaseConfig};
/// use chores_shared::models::member::{CreateMember, Member, MemberFilter};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::in_memory()).await?;
///
/// let bob = Member::create(&pool, CreateMember { name: "Bob".to_string() }).await?;
/// let found = Member::list(&pool, &MemberFilter::search("bo")).await?;
/// assert_eq!(found, vec![bob]);
/// # Ok(())
/// # }
/// ```

pub mod assignment;
pub mod chore;
pub mod error;
pub mod fields;
pub mod member;
pub mod user;

/// Builds a case-insensitive `LIKE` pattern matching `term` anywhere
///
/// `%`, `_` and `\` in the term are escaped; queries using the pattern must
/// compare against `LOWER(column)` and declare `ESCAPE '\'`. SQLite's `LOWER`
/// folds ASCII only, so the term is folded the same way.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.trim().to_ascii_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Normalizes an optional search term: blank means no filter
pub(crate) fn search_term(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(like_pattern)
}
