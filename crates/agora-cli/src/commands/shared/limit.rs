/// Compute effective limit with precedence: global flag -> configured default.
#[must_use]
pub fn effective_limit(global: Option<u32>, configured: u32) -> u32 {
    global.unwrap_or(configured).max(1)
}
