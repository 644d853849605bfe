use crate::domain::identity::{Identity, Selector};
use crate::domain::registry::Facet;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct RouteRow {
    handler: Identity,
    selector: Selector,
}

/// Writes the routing table as `handler,selector` CSV rows, one per binding,
/// in handler-list order.
pub struct RouteWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> RouteWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(sink),
        }
    }

    pub fn write_facets(&mut self, facets: &[Facet]) -> Result<()> {
        // Header even when there is nothing to route.
        self.writer.write_record(["handler", "selector"])?;
        for facet in facets {
            for selector in &facet.selectors {
                self.writer.serialize(RouteRow {
                    handler: facet.handler,
                    selector: *selector,
                })?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}
