/// Join a base URL and path segments with exactly one `/` between parts.
/// A `/` inside a segment is percent-escaped.
pub fn endpoint(base: &str, segments: &[&str]) -> String {
    let mut out = base.trim_end_matches('/').to_string();
    for seg in segments {
        let seg = seg.trim_matches('/');
        if seg.is_empty() {
            continue;
        }
        out.push('/');
        out.push_str(&seg.replace('/', "%2F"));
    }
    out
}
