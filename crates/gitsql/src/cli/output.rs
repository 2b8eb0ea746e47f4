use crate::cli::OutputFormat;
use crate::error::Result;
use crate::sql::{QueryResult, TableInfo};
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

const MAX_CELL_WIDTH: usize = 80;

pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    header: bool,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(writer: W, format: OutputFormat, header: bool) -> Self {
        Self {
            writer,
            format,
            header,
        }
    }

    pub fn write_result(&mut self, result: &QueryResult) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&result.to_json_array())?;
                writeln!(self.writer, "{}", json)?;
            }
            OutputFormat::Jsonl => {
                for row in result.to_json_array() {
                    writeln!(self.writer, "{}", serde_json::to_string(&row)?)?;
                }
            }
            OutputFormat::Csv => {
                let mut csv = csv::Writer::from_writer(&mut self.writer);
                if self.header {
                    csv.write_record(&result.columns)?;
                }
                for row in &result.rows {
                    csv.write_record(row.iter().map(cell))?;
                }
                csv.flush()?;
            }
            OutputFormat::Table => {
                if result.is_empty() {
                    writeln!(self.writer, "No results")?;
                    return Ok(());
                }
                let mut table = create_table();
                if self.header {
                    table.set_header(&result.columns);
                }
                for row in &result.rows {
                    table.add_row(row.iter().map(|v| truncate_string(&cell(v), MAX_CELL_WIDTH)));
                }
                writeln!(self.writer, "{}", table)?;
            }
        }
        Ok(())
    }

    pub fn write_tables(&mut self, tables: &[TableInfo]) -> Result<()> {
        match self.format {
            OutputFormat::Json => return self.write_json(tables),
            OutputFormat::Jsonl => {
                for info in tables {
                    writeln!(self.writer, "{}", serde_json::to_string(info)?)?;
                }
                return Ok(());
            }
            OutputFormat::Csv => {
                let mut csv = csv::Writer::from_writer(&mut self.writer);
                if self.header {
                    csv.write_record(["function", "description"])?;
                }
                for info in tables {
                    csv.write_record([info.signature().as_str(), info.description])?;
                }
                csv.flush()?;
                return Ok(());
            }
            OutputFormat::Table => {}
        }
        let mut table = create_table();
        table.set_header(vec!["function", "description"]);
        for info in tables {
            table.add_row(vec![info.signature(), info.description.to_string()]);
        }
        writeln!(self.writer, "{}", table)?;
        Ok(())
    }

    pub fn write_schema(&mut self, info: &TableInfo) -> Result<()> {
        if matches!(self.format, OutputFormat::Json | OutputFormat::Jsonl) {
            return self.write_json(info);
        }
        writeln!(self.writer, "{}", info.signature())?;
        writeln!(self.writer, "  {}", info.description)?;
        let mut table = create_table();
        table.set_header(vec!["column", "type"]);
        for column in info.columns {
            table.add_row(vec![column.name, column.sql_type]);
        }
        writeln!(self.writer, "{}", table)?;
        Ok(())
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        writeln!(self.writer, "{}", serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    pub fn writeln(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "{}", text)?;
        Ok(())
    }
}

pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        format!("{}...", s.chars().take(max_len - 3).collect::<String>())
    } else {
        s.to_string()
    }
}
