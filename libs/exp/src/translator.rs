//! Object-to-db path translation
//!
//! Rewrites the object-layer paths of an expression into storage paths, so
//! a qualifier built against one entity can be applied to the table of a
//! related entity. Both entry points return a new tree.

use cinnabar_map::{DbRelationship, MappingCatalog, ObjEntity};
use tracing::trace;

use crate::ast::Expression;
use crate::binder::{transform, Transformed};
use crate::error::{Error, Result};
use crate::path::{Path, PathNamespace, Segment};

/// Translates paths relative to one object entity.
pub struct PathTranslator<'a, C: MappingCatalog + ?Sized> {
    catalog: &'a C,
    entity: &'a str,
}

impl<'a, C: MappingCatalog + ?Sized> PathTranslator<'a, C> {
    pub fn new(catalog: &'a C, entity: &'a str) -> Self {
        Self { catalog, entity }
    }

    /// Db path of an object path. Db paths come back unchanged.
    pub fn to_db_path(&self, path: &Path) -> Result<Path> {
        if path.is_db() {
            return Ok(path.clone());
        }

        let mut entity = self.catalog.require_obj_entity(self.entity)?;
        let mut out = Vec::new();
        let last = path.len().saturating_sub(1);

        for (i, segment) in path.segments().iter().enumerate() {
            if i == last {
                if let Some(attribute) = entity.attribute(&segment.name) {
                    push_db_segments(&mut out, attribute.db_path().split('.'), segment);
                    break;
                }
            }

            let Some(relationship) = entity.relationship(&segment.name) else {
                return Err(if i == last {
                    Error::UnresolvableAttributeError {
                        attribute: segment.name.clone(),
                        entity: entity.name.clone(),
                    }
                } else {
                    Error::UnresolvableRelationshipError {
                        segment: segment.name.clone(),
                        entity: entity.name.clone(),
                    }
                });
            };
            push_db_segments(
                &mut out,
                relationship.db_relationship_names().into_iter(),
                segment,
            );
            entity = self.catalog.require_obj_entity(&relationship.target)?;
        }

        Ok(Path::from_segments(PathNamespace::Db, out))
    }

    /// Db relationships traversed by an object relationship path, starting
    /// at this translator's entity, paired with their source table name.
    fn db_chain(&self, relationship_path: &Path) -> Result<Vec<(String, &'a DbRelationship)>> {
        let mut entity: &ObjEntity = self.catalog.require_obj_entity(self.entity)?;
        let mut chain = Vec::new();

        for segment in relationship_path.segments() {
            let relationship = entity.relationship(&segment.name).ok_or_else(|| {
                Error::UnresolvableRelationshipError {
                    segment: segment.name.clone(),
                    entity: entity.name.clone(),
                }
            })?;
            for (table, db_relationship) in
                self.catalog.db_relationship_chain(&entity.name, &segment.name)?
            {
                chain.push((table.name.clone(), db_relationship));
            }
            entity = self.catalog.require_obj_entity(&relationship.target)?;
        }

        Ok(chain)
    }

    /// Db path leading from the end of `relationship_path` back to this
    /// translator's entity.
    pub fn reverse_prefix(&self, relationship_path: &Path) -> Result<Path> {
        let mut prefix: Vec<Segment> = Vec::new();
        for (table, db_relationship) in self.db_chain(relationship_path)? {
            let reverse = self
                .catalog
                .reverse_db_relationship(&table, &db_relationship.name)?;
            prefix.insert(0, Segment::new(reverse.name.clone()));
        }
        Ok(Path::from_segments(PathNamespace::Db, prefix))
    }

    pub fn translate_to_db_path(&self, expr: &Expression) -> Result<Expression> {
        let translated = rewrite_paths(expr, |path| self.to_db_path(path))?;
        trace!(entity = self.entity, %translated, "translated to db paths");
        Ok(translated)
    }

    pub fn translate_to_related_entity(
        &self,
        expr: &Expression,
        relationship_path: &str,
    ) -> Result<Expression> {
        let relationship_path = Path::parse(relationship_path)?;
        let prefix = self.reverse_prefix(&relationship_path)?;
        let translated = rewrite_paths(expr, |path| Ok(prefix.join(&self.to_db_path(path)?)))?;
        trace!(
            entity = self.entity,
            via = %relationship_path,
            %translated,
            "translated to related entity"
        );
        Ok(translated)
    }
}

fn push_db_segments<'n>(
    out: &mut Vec<Segment>,
    names: impl Iterator<Item = &'n str>,
    source: &Segment,
) {
    for (i, name) in names.enumerate() {
        out.push(Segment {
            name: name.to_string(),
            outer: source.outer,
            split: source.split && i == 0,
        });
    }
}

fn rewrite_paths<F>(expr: &Expression, mut rewrite: F) -> Result<Expression>
where
    F: FnMut(&Path) -> Result<Path>,
{
    let rewritten = transform(expr, &mut |node| match node {
        Expression::Path(path) => Ok(Transformed::Replace(Expression::Path(rewrite(path)?))),
        _ => Ok(Transformed::Keep),
    })?;
    rewritten.ok_or_else(|| Error::StructureError("path translation removed the expression".into()))
}

/// Rewrite the object paths of `expr`, relative to `entity`, into db paths.
pub fn translate_to_db_path<C: MappingCatalog + ?Sized>(
    catalog: &C,
    entity: &str,
    expr: &Expression,
) -> Result<Expression> {
    PathTranslator::new(catalog, entity).translate_to_db_path(expr)
}

/// Rewrite `expr`, relative to `entity`, so that it applies to the entity at
/// the end of `relationship_path`.
pub fn translate_to_related_entity<C: MappingCatalog + ?Sized>(
    catalog: &C,
    entity: &str,
    expr: &Expression,
    relationship_path: &str,
) -> Result<Expression> {
    PathTranslator::new(catalog, entity).translate_to_related_entity(expr, relationship_path)
}
