// Dispatcher: validates a configuration and hands it to the selected adapter

use crate::artifact::Artifact;
use crate::backend::interactive::InteractiveAdapter;
use crate::backend::static_gg::StaticAdapter;
use crate::backend::Adapter;
use crate::config::{Backend, PlotConfig};
use crate::data::DataTable;
use crate::error::{PlotError, Result};
use log::debug;
use std::sync::Arc;

/// Render `config` against `table` with the configured backend.
pub fn render(table: &Arc<dyn DataTable>, config: &PlotConfig) -> Result<Artifact> {
    match config.backend {
        Backend::Static => {
            let adapter = StaticAdapter;
            validate(&adapter, table.as_ref(), config)?;
            Ok(Artifact::Static(adapter.build(table, config)?))
        }
        Backend::Interactive => {
            let adapter = InteractiveAdapter;
            validate(&adapter, table.as_ref(), config)?;
            Ok(Artifact::Interactive(adapter.build(table, config)?))
        }
    }
}

/// Render-time checks, in order: geometry, backend support, required mappings, columns.
pub fn validate<A: Adapter>(adapter: &A, table: &dyn DataTable, config: &PlotConfig) -> Result<()> {
    let geometry = config.geometry.ok_or(PlotError::MissingGeometry)?;
    debug!("dispatching {} plot to the {} backend", geometry, adapter.backend());

    if !adapter.supports(geometry) {
        return Err(PlotError::UnsupportedGeometryForBackend {
            geometry: geometry.to_string(),
            backend: adapter.backend().to_string(),
        });
    }

    if let Some(aesthetic) = config.missing_required() {
        return Err(PlotError::MissingRequiredMapping {
            geometry: geometry.to_string(),
            aesthetic: aesthetic.to_string(),
        });
    }

    for column in config.referenced_columns() {
        if !table.has_column(column) {
            return Err(PlotError::UnknownColumn {
                column: column.to_string(),
                available: table.column_names().join(", "),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Figure;
    use crate::config::{Aesthetic, AestheticValue, Geometry};
    use crate::data::PlotData;
    use crate::verbs::*;

    fn table() -> Arc<dyn DataTable> {
        Arc::new(PlotData::from_columns([
            ("a", vec!["1", "2", "3"]),
            ("b", vec!["4", "5", "6"]),
            ("c", vec!["7", "8", "9"]),
        ]))
    }

    fn config(verbs: &[Verb]) -> PlotConfig {
        verbs
            .iter()
            .try_fold(PlotConfig::new(), |c, v| v.apply(&c))
            .unwrap()
    }

    #[test]
    fn test_missing_geometry() {
        let err = render(&table(), &PlotConfig::new()).unwrap_err();
        assert!(matches!(err, PlotError::MissingGeometry));
    }

    #[test]
    fn test_contour_static_unsupported() {
        let err = render(&table(), &config(&[plot_contour("a", "b", "c")])).unwrap_err();
        match err {
            PlotError::UnsupportedGeometryForBackend { geometry, backend } => {
                assert_eq!(geometry, "contour");
                assert_eq!(backend, "static");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_contour_interactive() {
        let artifact = render(
            &table(),
            &config(&[plot_contour("a", "b", "c"), to_interactive()]),
        )
        .unwrap();
        assert_eq!(artifact.backend(), Backend::Interactive);
    }

    #[test]
    fn test_heatmap_with_two_mappings() {
        // heatmap needs a value column bound to colour
        let cfg = PlotConfig::new()
            .with_geometry(Geometry::Heatmap)
            .with_mapping(Aesthetic::X, AestheticValue::Column("a".into()))
            .with_mapping(Aesthetic::Y, AestheticValue::Column("b".into()));
        let err = render(&table(), &cfg).unwrap_err();
        match err {
            PlotError::MissingRequiredMapping { geometry, aesthetic } => {
                assert_eq!(geometry, "heatmap");
                assert_eq!(aesthetic, "color");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_column_lists_available() {
        let err = render(&table(), &config(&[plot_points("a", "missing")])).unwrap_err();
        match err {
            PlotError::UnknownColumn { column, available } => {
                assert_eq!(column, "missing");
                assert_eq!(available, "a, b, c");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_facet_column() {
        let err = render(
            &table(),
            &config(&[plot_points("a", "b"), add_facets(None, None, Some("nope"))]),
        )
        .unwrap_err();
        assert!(matches!(err, PlotError::UnknownColumn { .. }));
    }

    #[test]
    fn test_both_backends_same_summary() {
        let base = config(&[plot_points("a", "b"), add_color("c")]);
        let s = render(&table(), &base).unwrap();
        let i = render(&table(), &to_interactive().apply(&base).unwrap()).unwrap();
        assert_eq!(s.backend(), Backend::Static);
        assert!(s.summary().same_content(&i.summary()));
    }
}
