//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}',
//! use [format_endpoint].

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
/// The route to issue an API token for a device, and to revoke the current one.
pub const TOKENS: &str = "/api/tokens";
/// The route to revoke every token belonging to the authenticated user.
pub const TOKENS_ALL: &str = "/api/tokens/all";
/// The route to create and list transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route clients open a websocket on to receive live events.
pub const WEBSOCKET: &str = "/ws";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/transactions/{transaction_id}',
/// '{transaction_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, char) in endpoint_path.char_indices() {
        match char {
            '{' => param_start = Some(i),
            '}' => param_end = Some(i),
            _ => {}
        }
    }

    match (param_start, param_end) {
        (Some(start), Some(end)) => {
            let mut result = String::new();
            result.push_str(&endpoint_path[..start]);
            result.push_str(&id.to_string());
            result.push_str(&endpoint_path[end + 1..]);
            result
        }
        _ => endpoint_path.to_owned(),
    }
}
