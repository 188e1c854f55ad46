// src/utils/html.rs

/// Strips active content from authored question text before it reaches a client.
///
/// Whitelist-based via `ammonia`: formatting tags such as <b> and <p> survive,
/// <script>/<iframe> (with their content) and event-handler attributes do not.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
