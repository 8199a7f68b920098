//! Status assembly: turn a compiled template into a string, recomputing only
//! what the cycle's dirty set asks for.

use log::{debug, warn};
use sbar_types::{Field, FieldSet, ERROR_MARKER, NULL_MARKER};
use std::collections::HashSet;

use crate::cache::{CacheKey, EntityPath, FieldCache};
use crate::dirty::expand_dirty;
use crate::provider::{Entity, FieldProvider};
use crate::template::{Segment, Template};

/// Counters describing the last assembled cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Leaf values read from a provider
    pub computed: usize,
    /// Values taken from the cache
    pub reused: usize,
    /// Leaf reads that failed
    pub failures: usize,
    /// Composite discoveries performed
    pub discoveries: usize,
    /// Composite discoveries that failed
    pub discovery_failures: usize,
    /// Cache entries dropped because their entity disappeared
    pub evicted: usize,
}

/// Owns the field cache and renders templates against it
#[derive(Debug, Default)]
pub struct StatusAssembler {
    cache: FieldCache,
    /// Keys already recomputed in the running cycle
    fresh: HashSet<CacheKey>,
    stats: CycleStats,
}

impl StatusAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &FieldCache {
        &self.cache
    }

    pub fn last_stats(&self) -> CycleStats {
        self.stats
    }

    /// Forget every cached value
    pub fn reset(&mut self) {
        self.cache.clear();
    }

    /// Render `template`, recomputing the fields in `dirty` and reusing the
    /// cache for everything else.
    pub fn assemble<P>(&mut self, template: &Template, dirty: FieldSet, provider: &mut P) -> String
    where
        P: FieldProvider + ?Sized,
    {
        self.fresh.clear();
        self.stats = CycleStats::default();

        let needed = expand_dirty(dirty) & template.fields();
        if !needed.is_empty() {
            provider.prepare(needed);
        }

        let mut out = String::new();
        self.render(template, dirty, provider, None, &EntityPath::root(), &mut out);
        out
    }

    fn render<P>(
        &mut self,
        template: &Template,
        dirty: FieldSet,
        provider: &mut P,
        entity: Option<&Entity>,
        path: &EntityPath,
        out: &mut String,
    ) where
        P: FieldProvider + ?Sized,
    {
        for segment in template.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Leaf(field) => self.render_leaf(*field, dirty, provider, entity, path, out),
                Segment::Composite {
                    field,
                    template: nested,
                } => self.render_composite(*field, nested, dirty, provider, entity, path, out),
            }
        }
    }

    fn render_leaf<P>(
        &mut self,
        field: Field,
        dirty: FieldSet,
        provider: &mut P,
        entity: Option<&Entity>,
        path: &EntityPath,
        out: &mut String,
    ) where
        P: FieldProvider + ?Sized,
    {
        let key = CacheKey::new(field, path.clone());

        if !dirty.contains(field) || self.fresh.contains(&key) {
            self.stats.reused += 1;
            out.push_str(self.cache.get(&key).unwrap_or(NULL_MARKER));
            return;
        }

        let value = match provider.get(field, entity) {
            Ok(value) => {
                self.stats.computed += 1;
                value
            }
            Err(e) => {
                self.stats.failures += 1;
                warn!("Failed to read {} at {}: {:#}", field, path, e);
                ERROR_MARKER.to_string()
            }
        };
        out.push_str(&value);
        self.cache.insert(key.clone(), value);
        self.fresh.insert(key);
    }

    #[allow(clippy::too_many_arguments)]
    fn render_composite<P>(
        &mut self,
        field: Field,
        nested: &Template,
        dirty: FieldSet,
        provider: &mut P,
        entity: Option<&Entity>,
        path: &EntityPath,
        out: &mut String,
    ) where
        P: FieldProvider + ?Sized,
    {
        let key = CacheKey::new(field, path.clone());

        if !dirty.intersects(field.subtree()) || self.fresh.contains(&key) {
            self.stats.reused += 1;
            out.push_str(self.cache.get(&key).unwrap_or(NULL_MARKER));
            return;
        }

        // Recomputing the composite itself recomputes everything it owns
        let nested_dirty = if dirty.contains(field) {
            dirty | field.sub_fields()
        } else {
            dirty
        };

        self.stats.discoveries += 1;
        let rendering = match provider.discover(field, entity) {
            Ok(entities) => {
                debug!("{} at {}: {} entities", field, path, entities.len());
                let mut rendering = String::new();
                for child in &entities {
                    let child_path = path.child(field, &child.id);
                    self.render(nested, nested_dirty, provider, Some(child), &child_path, &mut rendering);
                }
                let ids = entities.into_iter().map(|e| e.id).collect();
                self.stats.evicted += self.cache.update_members(&key, ids);
                rendering
            }
            Err(e) => {
                self.stats.discovery_failures += 1;
                warn!("Failed to discover {} at {}: {:#}", field, path, e);
                String::new()
            }
        };

        out.push_str(&rendering);
        self.cache.insert(key.clone(), rendering);
        self.fresh.insert(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::FormatConfig;
    use crate::registry::Scope;
    use crate::template::{compile, compile_scope};
    use anyhow::{anyhow, Result};
    use std::collections::HashMap;

    /// Provider backed by in-memory tables, counting every call
    #[derive(Default)]
    struct MockProvider {
        values: HashMap<(Field, Option<String>), String>,
        entities: HashMap<(Field, Option<String>), Vec<String>>,
        failing: HashSet<Field>,
        failing_discovery: HashSet<Field>,
        gets: HashMap<(Field, Option<String>), usize>,
        discovers: HashMap<(Field, Option<String>), usize>,
        prepared: Vec<FieldSet>,
    }

    impl MockProvider {
        fn set(&mut self, field: Field, value: &str) {
            self.values.insert((field, None), value.to_string());
        }

        fn set_for(&mut self, field: Field, entity: &str, value: &str) {
            self.values
                .insert((field, Some(entity.to_string())), value.to_string());
        }

        fn entities(&mut self, composite: Field, parent: Option<&str>, ids: &[&str]) {
            self.entities.insert(
                (composite, parent.map(str::to_string)),
                ids.iter().map(|id| id.to_string()).collect(),
            );
        }

        fn total_gets(&self) -> usize {
            self.gets.values().sum()
        }
    }

    impl FieldProvider for MockProvider {
        fn prepare(&mut self, dirty: FieldSet) {
            self.prepared.push(dirty);
        }

        fn get(&mut self, field: Field, entity: Option<&Entity>) -> Result<String> {
            let key = (field, entity.map(|e| e.id.clone()));
            *self.gets.entry(key.clone()).or_default() += 1;
            if self.failing.contains(&field) {
                return Err(anyhow!("sensor {} is broken", field));
            }
            self.values
                .get(&key)
                .cloned()
                .ok_or_else(|| anyhow!("no value for {}", field))
        }

        fn discover(&mut self, composite: Field, parent: Option<&Entity>) -> Result<Vec<Entity>> {
            let key = (composite, parent.map(|e| e.id.clone()));
            *self.discovers.entry(key.clone()).or_default() += 1;
            if self.failing_discovery.contains(&composite) {
                return Err(anyhow!("cannot enumerate {}", composite));
            }
            Ok(self
                .entities
                .get(&key)
                .map(|ids| ids.iter().map(Entity::new).collect())
                .unwrap_or_default())
        }
    }

    fn status(format: &str) -> Template {
        compile(Scope::Status, format, |c| Scope::Status.lookup(c).map(Segment::Leaf))
    }

    fn disk_formats() -> FormatConfig {
        FormatConfig {
            status: "[/d] mem /m".to_string(),
            disk: "<dev=/n size=/s{/p}>".to_string(),
            partition: "(/n@/u)".to_string(),
            ..FormatConfig::default()
        }
    }

    fn disk_provider() -> MockProvider {
        let mut provider = MockProvider::default();
        provider.set(Field::Memory, "40");
        provider.entities(Field::Disk, None, &["sda", "sdb"]);
        provider.entities(Field::Part, Some("sda"), &["sda1", "sda2"]);
        provider.entities(Field::Part, Some("sdb"), &["sdb1"]);
        for (disk, size) in [("sda", "1T"), ("sdb", "64G")] {
            provider.set_for(Field::DiskName, disk, disk);
            provider.set_for(Field::DiskSize, disk, size);
        }
        for (part, usage) in [("sda1", "10"), ("sda2", "20"), ("sdb1", "30")] {
            provider.set_for(Field::PartName, part, part);
            provider.set_for(Field::PartUsage, part, usage);
        }
        provider
    }

    #[test]
    fn test_cpu_memory_example() {
        let template = status("CPU:/c Mem:/m");
        let mut assembler = StatusAssembler::new();
        let mut provider = MockProvider::default();
        provider.set(Field::Cpu, "12");
        provider.set(Field::Memory, "40");

        let first = assembler.assemble(&template, FieldSet::ALL, &mut provider);
        assert_eq!(first, "CPU:12 Mem:40");

        provider.set(Field::Cpu, "99");
        provider.set(Field::Memory, "41");
        let second = assembler.assemble(&template, Field::Memory.into(), &mut provider);
        assert_eq!(second, "CPU:12 Mem:41");
        assert_eq!(provider.gets[&(Field::Cpu, None)], 1);
    }

    #[test]
    fn test_unknown_token_renders_only_literals() {
        let template = status("a /z b /m");
        let mut provider = MockProvider::default();
        provider.set(Field::Memory, "7");
        let out = StatusAssembler::new().assemble(&template, FieldSet::ALL, &mut provider);
        assert_eq!(out, "a  b 7");
    }

    #[test]
    fn test_clean_cycle_is_idempotent() {
        let template = compile_scope(Scope::Status, &disk_formats());
        let mut assembler = StatusAssembler::new();
        let mut provider = disk_provider();
        let first = assembler.assemble(&template, FieldSet::ALL, &mut provider);
        let gets = provider.total_gets();
        let prepared = provider.prepared.len();

        provider.set(Field::Memory, "99");
        let second = assembler.assemble(&template, FieldSet::NONE, &mut provider);
        assert_eq!(first, second);
        assert_eq!(provider.total_gets(), gets);
        assert_eq!(provider.prepared.len(), prepared);
        assert_eq!(assembler.last_stats().computed, 0);
    }

    #[test]
    fn test_full_cycle_computes_everything_once() {
        let template = compile_scope(Scope::Status, &disk_formats());
        let mut assembler = StatusAssembler::new();
        let mut provider = disk_provider();

        let out = assembler.assemble(&template, FieldSet::ALL, &mut provider);
        assert_eq!(
            out,
            "[<dev=sda size=1T{(sda1@10)(sda2@20)}><dev=sdb size=64G{(sdb1@30)}>] mem 40"
        );
        assert!(provider.gets.values().all(|count| *count == 1));
        assert_eq!(provider.gets.len(), 1 + 2 * 2 + 3 * 2);
        assert!(provider.discovers.values().all(|count| *count == 1));
        assert_eq!(provider.discovers.len(), 3);

        // A second full cycle recomputes everything again, exactly once more
        assembler.assemble(&template, FieldSet::ALL, &mut provider);
        assert!(provider.gets.values().all(|count| *count == 2));
    }

    #[test]
    fn test_repeated_token_is_read_once_per_cycle() {
        let template = status("/c|/c");
        let mut provider = MockProvider::default();
        provider.set(Field::Cpu, "5");
        let out = StatusAssembler::new().assemble(&template, FieldSet::ALL, &mut provider);
        assert_eq!(out, "5|5");
        assert_eq!(provider.gets[&(Field::Cpu, None)], 1);
    }

    #[test]
    fn test_provider_failure_is_isolated() {
        let template = status("/c /m /s");
        let mut provider = MockProvider::default();
        provider.set(Field::Cpu, "1");
        provider.set(Field::Memory, "2");
        provider.set(Field::Swap, "3");
        provider.failing.insert(Field::Memory);

        let mut assembler = StatusAssembler::new();
        let out = assembler.assemble(&template, FieldSet::ALL, &mut provider);
        assert_eq!(out, format!("1 {} 3", ERROR_MARKER));
        assert_eq!(assembler.last_stats().failures, 1);

        // The marker is what was shown, so it is what a clean cycle reuses
        let out = assembler.assemble(&template, FieldSet::NONE, &mut provider);
        assert_eq!(out, format!("1 {} 3", ERROR_MARKER));

        provider.failing.clear();
        let out = assembler.assemble(&template, Field::Memory.into(), &mut provider);
        assert_eq!(out, "1 2 3");
    }

    #[test]
    fn test_missing_cache_renders_placeholder() {
        let template = status("cpu=/c;");
        let mut provider = MockProvider::default();
        let out = StatusAssembler::new().assemble(&template, FieldSet::NONE, &mut provider);
        assert_eq!(out, "cpu=;");
        assert!(provider.gets.is_empty());
    }

    #[test]
    fn test_removed_entity_leaves_no_trace() {
        let template = compile_scope(Scope::Status, &disk_formats());
        let mut assembler = StatusAssembler::new();
        let mut provider = disk_provider();
        let first = assembler.assemble(&template, FieldSet::ALL, &mut provider);
        assert!(first.contains("sdb"));

        provider.entities(Field::Disk, None, &["sda"]);
        let second = assembler.assemble(&template, Field::Disk.into(), &mut provider);
        assert!(!second.contains("sdb"));
        assert!(!second.contains("64G"));
        assert_eq!(second, "[<dev=sda size=1T{(sda1@10)(sda2@20)}>] mem 40");
        assert_eq!(assembler.last_stats().evicted, 5);

        // Re-plugging without a recompute of its fields shows empty values,
        // never the stale ones
        provider.entities(Field::Disk, None, &["sda", "sdb"]);
        let third = assembler.assemble(&template, FieldSet::from(Field::DiskSize), &mut provider);
        assert_eq!(third, "[<dev=sda size=1T{(sda1@10)(sda2@20)}><dev= size=64G{}>] mem 40");
    }

    #[test]
    fn test_sub_field_dirtiness_reexpands_composite() {
        let template = compile_scope(Scope::Status, &disk_formats());
        let mut assembler = StatusAssembler::new();
        let mut provider = disk_provider();
        assembler.assemble(&template, FieldSet::ALL, &mut provider);

        provider.set_for(Field::PartUsage, "sda2", "25");
        provider.set_for(Field::DiskSize, "sda", "2T");
        let out = assembler.assemble(&template, Field::PartUsage.into(), &mut provider);
        // Disk size is not dirty, so the cached 1T stays
        assert_eq!(
            out,
            "[<dev=sda size=1T{(sda1@10)(sda2@25)}><dev=sdb size=64G{(sdb1@30)}>] mem 40"
        );
        assert_eq!(provider.discovers[&(Field::Disk, None)], 2);
        assert_eq!(provider.gets[&(Field::DiskSize, Some("sda".to_string()))], 1);
        assert_eq!(provider.gets[&(Field::PartName, Some("sda1".to_string()))], 1);
    }

    #[test]
    fn test_unrelated_dirtiness_reuses_composite() {
        let template = compile_scope(Scope::Status, &disk_formats());
        let mut assembler = StatusAssembler::new();
        let mut provider = disk_provider();
        assembler.assemble(&template, FieldSet::ALL, &mut provider);

        provider.entities(Field::Disk, None, &[]);
        let out = assembler.assemble(&template, Field::Memory.into(), &mut provider);
        assert!(out.contains("sdb"));
        assert_eq!(provider.discovers[&(Field::Disk, None)], 1);
    }

    #[test]
    fn test_discovery_order_is_preserved() {
        let template = compile_scope(Scope::Status, &disk_formats());
        let mut provider = disk_provider();
        provider.entities(Field::Disk, None, &["sdb", "sda"]);
        let out = StatusAssembler::new().assemble(&template, FieldSet::ALL, &mut provider);
        let sdb = out.find("dev=sdb").unwrap();
        let sda = out.find("dev=sda").unwrap();
        assert!(sdb < sda);
    }

    #[test]
    fn test_discovery_failure_renders_empty() {
        let template = compile_scope(Scope::Status, &disk_formats());
        let mut assembler = StatusAssembler::new();
        let mut provider = disk_provider();
        assembler.assemble(&template, FieldSet::ALL, &mut provider);

        provider.failing_discovery.insert(Field::Disk);
        let out = assembler.assemble(&template, FieldSet::ALL, &mut provider);
        assert_eq!(out, "[] mem 40");
        assert_eq!(assembler.last_stats().discovery_failures, 1);

        // Recovery on the next dirty cycle, with per-entity values intact
        provider.failing_discovery.clear();
        let out = assembler.assemble(&template, Field::Part.into(), &mut provider);
        assert_eq!(
            out,
            "[<dev=sda size=1T{(sda1@10)(sda2@20)}><dev=sdb size=64G{(sdb1@30)}>] mem 40"
        );
    }

    #[test]
    fn test_prepare_receives_expanded_fields() {
        let template = compile_scope(Scope::Status, &disk_formats());
        let mut provider = disk_provider();
        StatusAssembler::new().assemble(&template, Field::Disk.into(), &mut provider);
        let prepared = provider.prepared[0];
        assert!(prepared.contains(Field::Disk));
        assert!(prepared.contains(Field::PartUsage));
        assert!(!prepared.contains(Field::Memory));
        // Fields absent from the template are never requested
        assert!(!prepared.contains(Field::DiskRotational));
    }

    #[test]
    fn test_boxed_provider_forwards_every_call() {
        let template = compile_scope(Scope::Status, &disk_formats());
        let mut provider: Box<dyn FieldProvider> = Box::new(disk_provider());
        let status = StatusAssembler::new().assemble(&template, FieldSet::ALL, &mut provider);
        assert_eq!(
            status,
            "[<dev=sda size=1T{(sda1@10)(sda2@20)}><dev=sdb size=64G{(sdb1@30)}>] mem 40"
        );
    }
}
