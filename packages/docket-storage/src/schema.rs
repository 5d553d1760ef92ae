pub fn render_schema(vector_dim: u32) -> String {
	let init = include_str!("../../../sql/init.sql");
	let expanded = expand_includes(init);

	expanded.replace("<VECTOR_DIM>", &vector_dim.to_string())
}

pub fn render_fulltext() -> &'static str {
	include_str!("../../../sql/fulltext.sql")
}

/// Splits a rendered script into executable statements.
pub fn statements(sql: &str) -> impl Iterator<Item = &str> {
	sql.split(';').map(str::trim).filter(|statement| !statement.is_empty())
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"00_extensions.sql" => out.push_str(include_str!("../../../sql/00_extensions.sql")),
				"tables/001_doc_documents.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_doc_documents.sql")),
				"tables/002_doc_chunks.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_doc_chunks.sql")),
				"tables/003_eval_logs.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_eval_logs.sql")),
				"tables/004_audit_logs.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_audit_logs.sql")),
				other => {
					tracing::warn!(include = other, "Unknown schema include skipped.");
				},
			}

			out.push('\n');

			continue;
		}

		out.push_str(line);
		out.push('\n');
	}

	out
}
