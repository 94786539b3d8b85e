//! Module: engine
//! Responsibility: one HTTP verb against one resolved target. Content
//! negotiation, body decoding, verb dispatch, deep-update semantics,
//! filters and paging at the root list, and the single place structured
//! errors become status codes.
//! Does not own: transport, routing, or persistence internals.

mod filters;
mod paging;
mod request;
mod response;
mod update;


pub use request::{ACCEPTED_MEDIA_TYPE, Method, Request};
pub use response::{EngineError, Response};

use crate::{
    document::{Document, FieldSpec, Schema},
    resolve::{Resolution, Step, TargetKind, locate, locate_mut, resolve},
    ser::Serializer,
    store::{DocumentStore, StoreError},
    value::DocValue,
};
use serde_json::Value as Json;
use tracing::{debug, warn};

///
/// Authenticator
///
/// Hook run before resolution. A denial short-circuits the request with
/// the returned error, 401 by default.
///

pub trait Authenticator {
    fn authenticate(&self, request: &Request) -> Result<(), EngineError>;
}

struct AllowAll;

impl Authenticator for AllowAll {
    fn authenticate(&self, _request: &Request) -> Result<(), EngineError> {
        Ok(())
    }
}

///
/// Resource
///
/// One CRUD endpoint tree: a wire shape, a storage schema, and the
/// request-scoped dispatch over them. Holds no per-request state.
///

pub struct Resource {
    name: &'static str,
    description: Option<&'static str>,
    serializer: Serializer,
    schema: Schema,
    items_per_page: usize,
    page_param: &'static str,
    expose_unique_errors: bool,
    authenticator: Box<dyn Authenticator>,
}

impl Resource {
    #[must_use]
    pub fn new(name: &'static str, serializer: Serializer, schema: Schema) -> Self {
        Self {
            name,
            description: None,
            serializer,
            schema,
            items_per_page: 100,
            page_param: "page",
            expose_unique_errors: false,
            authenticator: Box::new(AllowAll),
        }
    }

    #[must_use]
    pub const fn description(mut self, text: &'static str) -> Self {
        self.description = Some(text);
        self
    }

    #[must_use]
    pub const fn items_per_page(mut self, count: usize) -> Self {
        self.items_per_page = count;
        self
    }

    #[must_use]
    pub const fn page_param(mut self, param: &'static str) -> Self {
        self.page_param = param;
        self
    }

    /// Opt in to uniqueness-violation detail in 409 bodies. Off by
    /// default so constraint names never leak.
    #[must_use]
    pub const fn expose_unique_errors(mut self) -> Self {
        self.expose_unique_errors = true;
        self
    }

    #[must_use]
    pub fn authenticator(mut self, hook: impl Authenticator + 'static) -> Self {
        self.authenticator = Box::new(hook);
        self
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn describe(&self) -> Option<&'static str> {
        self.description
    }

    #[must_use]
    pub const fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Handle one request to completion.
    pub fn handle(&self, store: &mut dyn DocumentStore, request: &Request) -> Response {
        match self.try_handle(store, request) {
            Ok(response) => response,
            Err(err) => {
                if err.status >= 500 {
                    warn!(
                        resource = self.name,
                        status = err.status,
                        message = %err.message,
                        "request failed"
                    );
                } else {
                    debug!(
                        resource = self.name,
                        status = err.status,
                        message = %err.message,
                        "request rejected"
                    );
                }
                err.into_response()
            }
        }
    }

    fn try_handle(
        &self,
        store: &mut dyn DocumentStore,
        request: &Request,
    ) -> Result<Response, EngineError> {
        self.authenticator.authenticate(request)?;

        let body = decode_body(request)?;

        let create = request.method == Method::Put;
        let target = resolve(store, &self.serializer, &request.path, create)?;
        debug!(
            resource = self.name,
            method = %request.method,
            path = %request.path,
            kind = ?target.kind,
            "dispatching"
        );

        match request.method {
            Method::Get => self.get(store, request, &target),
            Method::Post => self.post(store, &target, &body),
            Method::Put => self.put(store, &target, &body),
            Method::Delete => self.delete(store, &target),
        }
    }

    // ------------------------------------------------------------------
    // GET
    // ------------------------------------------------------------------

    fn get(
        &self,
        store: &dyn DocumentStore,
        request: &Request,
        target: &Resolution<'_>,
    ) -> Result<Response, EngineError> {
        match target.kind {
            TargetKind::List if target.is_base_document => self.get_root_list(store, request),
            TargetKind::List => {
                // Nested list: raw contents, no filters or paging.
                let base = require_base(target)?;
                let field = target.field.ok_or_else(EngineError::internal)?;
                let value = locate(base, &target.steps)
                    .cloned()
                    .unwrap_or_else(|| DocValue::List(Vec::new()));
                let body = field.serialize(&value)?;
                Ok(Response::json(200, body))
            }
            TargetKind::Item => {
                let base = require_base(target)?;
                if target.steps.is_empty() {
                    let body = self.serializer.serialize(base)?;
                    return Ok(Response::json(200, body));
                }
                match locate(base, &target.steps).and_then(DocValue::as_document) {
                    Some(doc) => {
                        let body = target.serializer.serialize(doc)?;
                        Ok(Response::json(200, body))
                    }
                    None => Ok(Response::json(200, Json::Null)),
                }
            }
            TargetKind::Scalar => {
                let base = require_base(target)?;
                let field = target.field.ok_or_else(EngineError::internal)?;
                let value = locate(base, &target.steps)
                    .cloned()
                    .unwrap_or(DocValue::Null);
                let body = field.serialize(&value)?;
                Ok(Response::json(200, body))
            }
        }
    }

    fn get_root_list(
        &self,
        store: &dyn DocumentStore,
        request: &Request,
    ) -> Result<Response, EngineError> {
        let filters = filters::parse(&self.serializer, &request.query, self.page_param)?;
        let number = paging::page_number(&request.query, self.page_param)?;
        let count = store.count(&filters);
        let page = paging::paginate(count, self.items_per_page, number)?;

        let docs = store.select(&filters, page.range.clone());
        let mut items = Vec::with_capacity(docs.len());
        for doc in &docs {
            items.push(self.serializer.serialize(doc)?);
        }

        let mut response = Response::json(200, Json::Array(items));
        if let Some(link) =
            paging::link_header(&request.path, &request.query, self.page_param, &page)
        {
            response = response.with_header("Link", link);
        }
        Ok(response)
    }

    // ------------------------------------------------------------------
    // POST
    // ------------------------------------------------------------------

    fn post(
        &self,
        store: &mut dyn DocumentStore,
        target: &Resolution<'_>,
        body: &Option<Json>,
    ) -> Result<Response, EngineError> {
        let body = body.as_ref().ok_or_else(EngineError::internal)?;

        match target.kind {
            TargetKind::Item | TargetKind::Scalar => Err(EngineError::new(
                405,
                "Can't POST to an item, use PUT instead.",
            )),
            TargetKind::List if target.is_base_document => self.post_root(store, body),
            TargetKind::List => self.post_nested(store, target, body),
        }
    }

    fn post_root(
        &self,
        store: &mut dyn DocumentStore,
        body: &Json,
    ) -> Result<Response, EngineError> {
        let payloads = as_batch(body);

        // Validate the whole batch before persisting any of it.
        let mut docs = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            let parsed = self.serializer.deserialize(payload, false)?;
            let mut doc = self.schema.new_document();
            update::apply_update(&self.serializer, Some(&self.schema), &mut doc, &parsed);
            docs.push(doc);
        }

        for doc in &docs {
            store
                .insert(&self.schema, doc)
                .map_err(|err| self.map_store_error(err))?;
        }

        let mut out = Vec::with_capacity(docs.len());
        for doc in &docs {
            out.push(self.serializer.serialize(doc)?);
        }
        Ok(Response::json(201, echo_shape(body, out)))
    }

    fn post_nested(
        &self,
        store: &mut dyn DocumentStore,
        target: &Resolution<'_>,
        body: &Json,
    ) -> Result<Response, EngineError> {
        let field = target.field.ok_or_else(EngineError::internal)?;
        let Some(sub) = field.item_serializer() else {
            return Err(EngineError::new(
                400,
                format!("Can't POST to '{}', it is not a list of documents.", field.name()),
            ));
        };

        let payloads = as_batch(body);
        let item_schema = schema_at(&self.schema, &target.steps);

        let mut created = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            let parsed = sub.deserialize(payload, false)?;
            let mut doc = item_schema.map(Schema::new_document).unwrap_or_default();
            update::apply_update(sub, item_schema, &mut doc, &parsed);
            created.push(doc);
        }

        let mut base = require_base(target)?.clone();
        let slot = ensure_slot(&mut base, &target.steps, DocValue::List(Vec::new()))
            .ok_or_else(EngineError::internal)?;
        let items = slot.as_list_mut().ok_or_else(EngineError::internal)?;
        items.extend(created.iter().cloned().map(DocValue::Document));

        store
            .save(&self.schema, &base)
            .map_err(|err| self.map_store_error(err))?;

        let mut out = Vec::with_capacity(created.len());
        for doc in &created {
            out.push(sub.serialize(doc)?);
        }
        Ok(Response::json(201, echo_shape(body, out)))
    }

    // ------------------------------------------------------------------
    // PUT
    // ------------------------------------------------------------------

    fn put(
        &self,
        store: &mut dyn DocumentStore,
        target: &Resolution<'_>,
        body: &Option<Json>,
    ) -> Result<Response, EngineError> {
        let body = body.as_ref().ok_or_else(EngineError::internal)?;

        match target.kind {
            TargetKind::List => Err(EngineError::new(400, "No id provided.")),
            TargetKind::Scalar => self.put_scalar(store, target, body),
            TargetKind::Item if target.create_pending.is_some() => {
                self.put_create(store, target, body)
            }
            TargetKind::Item => self.put_update(store, target, body),
        }
    }

    /// Replace/merge an existing item. The identifier round-trips through
    /// `allow_readonly` so list matching works; readonly values still
    /// never reach storage.
    fn put_update(
        &self,
        store: &mut dyn DocumentStore,
        target: &Resolution<'_>,
        body: &Json,
    ) -> Result<Response, EngineError> {
        let payload = target.serializer.deserialize(body, true)?;
        let mut base = require_base(target)?.clone();

        let out = if target.steps.is_empty() {
            update::apply_update(&self.serializer, Some(&self.schema), &mut base, &payload);
            self.serializer.serialize(&base)?
        } else {
            let item_schema = schema_at(&self.schema, &target.steps);
            let fresh = DocValue::Document(
                item_schema.map(Schema::new_document).unwrap_or_default(),
            );
            let slot = ensure_slot(&mut base, &target.steps, fresh)
                .ok_or_else(EngineError::internal)?;
            let doc = slot.as_document_mut().ok_or_else(EngineError::internal)?;
            update::apply_update(target.serializer, item_schema, doc, &payload);
            target.serializer.serialize(doc)?
        };

        store
            .save(&self.schema, &base)
            .map_err(|err| self.map_store_error(err))?;
        Ok(Response::json(200, out))
    }

    /// Create at the identifier the path named: a new root document, or a
    /// new element appended to the resolved list.
    fn put_create(
        &self,
        store: &mut dyn DocumentStore,
        target: &Resolution<'_>,
        body: &Json,
    ) -> Result<Response, EngineError> {
        let pending = target
            .create_pending
            .as_ref()
            .ok_or_else(EngineError::internal)?;

        if target.base.is_none() {
            // Root create.
            let payload = self.serializer.deserialize(body, true)?;
            let mut doc = self.schema.new_document();
            update::apply_update(&self.serializer, Some(&self.schema), &mut doc, &payload);
            doc.set(pending.identifier_field, pending.identifier.clone());

            store
                .save(&self.schema, &doc)
                .map_err(|err| self.map_store_error(err))?;
            let out = self.serializer.serialize(&doc)?;
            return Ok(Response::json(201, out));
        }

        // Nested create: steps address the list to append to.
        let sub = target.serializer;
        let payload = sub.deserialize(body, true)?;
        let item_schema = schema_at(&self.schema, &target.steps);
        let mut doc = item_schema.map(Schema::new_document).unwrap_or_default();
        update::apply_update(sub, item_schema, &mut doc, &payload);
        doc.set(pending.identifier_field, pending.identifier.clone());

        let mut base = require_base(target)?.clone();
        let slot = ensure_slot(&mut base, &target.steps, DocValue::List(Vec::new()))
            .ok_or_else(EngineError::internal)?;
        let items = slot.as_list_mut().ok_or_else(EngineError::internal)?;
        items.push(DocValue::Document(doc.clone()));

        store
            .save(&self.schema, &base)
            .map_err(|err| self.map_store_error(err))?;
        let out = sub.serialize(&doc)?;
        Ok(Response::json(201, out))
    }

    fn put_scalar(
        &self,
        store: &mut dyn DocumentStore,
        target: &Resolution<'_>,
        body: &Json,
    ) -> Result<Response, EngineError> {
        let field = target.field.ok_or_else(EngineError::internal)?;
        if field.is_readonly() {
            return Err(EngineError::new(
                400,
                format!("The field '{}' is readonly.", field.name()),
            ));
        }

        let value = field.deserialize(body, true)?;
        let mut base = require_base(target)?.clone();
        let slot = ensure_slot(&mut base, &target.steps, DocValue::Null)
            .ok_or_else(EngineError::internal)?;
        *slot = value.clone();

        store
            .save(&self.schema, &base)
            .map_err(|err| self.map_store_error(err))?;

        let echo = if field.is_writeonly() {
            Json::Null
        } else {
            field.serialize(&value)?
        };
        Ok(Response::json(200, echo))
    }

    // ------------------------------------------------------------------
    // DELETE
    // ------------------------------------------------------------------

    fn delete(
        &self,
        store: &mut dyn DocumentStore,
        target: &Resolution<'_>,
    ) -> Result<Response, EngineError> {
        match target.kind {
            TargetKind::Scalar => Err(EngineError::new(
                400,
                "Can't delete a field, update it to null instead.",
            )),
            TargetKind::List => Err(EngineError::new(400, "No id provided.")),
            TargetKind::Item if target.steps.is_empty() => {
                let base = require_base(target)?;
                let id = base.id().ok_or_else(EngineError::internal)?;
                store
                    .delete(id)
                    .map_err(|err| self.map_store_error(err))?;
                Ok(Response::no_content())
            }
            TargetKind::Item if target.in_parent_list() => {
                let mut base = require_base(target)?.clone();
                let Some((Step::Item(index), parents)) = target.steps.split_last() else {
                    return Err(EngineError::internal());
                };

                let list = if parents.is_empty() {
                    None
                } else {
                    locate_mut(&mut base, parents).and_then(DocValue::as_list_mut)
                };
                let list = list.ok_or_else(EngineError::internal)?;
                if *index < list.len() {
                    list.remove(*index);
                }

                store
                    .save(&self.schema, &base)
                    .map_err(|err| self.map_store_error(err))?;
                Ok(Response::no_content())
            }
            TargetKind::Item => Err(EngineError::new(
                400,
                "Can't delete a field, update it to null instead.",
            )),
        }
    }

    // ------------------------------------------------------------------
    // Storage error mapping
    // ------------------------------------------------------------------

    fn map_store_error(&self, err: StoreError) -> EngineError {
        match err {
            StoreError::NotFound { id } => EngineError::new(
                404,
                format!("the resource specified with identifier '{id}' could not be found"),
            ),
            StoreError::NotUnique { detail } => {
                if self.expose_unique_errors {
                    EngineError::new(409, detail)
                } else {
                    EngineError::new(
                        409,
                        "A value in this document violates a unique constraint.",
                    )
                }
            }
            StoreError::Validation { errors } => {
                // Only failures on fields the wire shape exposes are
                // client-actionable.
                let exposed: Vec<(String, String)> = errors
                    .into_iter()
                    .filter(|(path, _)| {
                        let first = path.split('.').next().unwrap_or_default();
                        self.serializer.get(first).is_some()
                    })
                    .collect();

                if exposed.is_empty() {
                    warn!(resource = self.name, "validation failed on unexposed fields");
                    EngineError::internal()
                } else {
                    EngineError::with_errors(400, "The data failed validation.", exposed)
                }
            }
        }
    }
}

/// Negotiate the content type and decode the JSON body. Only POST and
/// PUT carry one.
fn decode_body(request: &Request) -> Result<Option<Json>, EngineError> {
    if !matches!(request.method, Method::Post | Method::Put) {
        return Ok(None);
    }

    check_content_type(request.content_type.as_deref())?;

    let raw = request.body.as_deref().unwrap_or_default();
    if raw.trim().is_empty() {
        return Err(EngineError::new(400, "No data provided in request."));
    }
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|_| EngineError::new(400, "Request data is not valid JSON."))
}

/// Reject anything but the accepted media type, with an optional utf-8
/// charset parameter.
fn check_content_type(header: Option<&str>) -> Result<(), EngineError> {
    let unsupported = |given: &str| {
        EngineError::new(
            415,
            format!("Content-Type '{given}' is not supported, use '{ACCEPTED_MEDIA_TYPE}'."),
        )
    };

    let Some(header) = header else {
        return Err(unsupported("none"));
    };

    let mut parts = header.split(';');
    let media = parts.next().unwrap_or_default().trim();
    if media != ACCEPTED_MEDIA_TYPE {
        return Err(unsupported(header));
    }
    for param in parts {
        let param = param.trim();
        if !param.is_empty() && !param.eq_ignore_ascii_case("charset=utf-8") {
            return Err(unsupported(header));
        }
    }
    Ok(())
}

/// One object is a batch of one; an array is taken element-wise.
fn as_batch(body: &Json) -> Vec<&Json> {
    match body {
        Json::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Echo the created documents in the shape the client sent.
fn echo_shape(body: &Json, mut out: Vec<Json>) -> Json {
    if body.is_array() {
        Json::Array(out)
    } else if out.is_empty() {
        Json::Null
    } else {
        out.swap_remove(0)
    }
}

fn require_base<'t>(target: &'t Resolution<'_>) -> Result<&'t Document, EngineError> {
    target.base.as_ref().ok_or_else(EngineError::internal)
}

/// The schema governing the documents addressed by `steps`. Item steps
/// stay within the same element schema.
fn schema_at<'a>(schema: &'a Schema, steps: &[Step]) -> Option<&'a Schema> {
    let mut current = Some(schema);
    for step in steps {
        if let Step::Field(name) = step {
            current = current
                .and_then(|s| s.spec(name))
                .and_then(FieldSpec::embedded_schema);
        }
    }
    current
}

/// Locate a slot, first materializing a missing or null trailing field
/// with `default`.
fn ensure_slot<'d>(
    base: &'d mut Document,
    steps: &[Step],
    default: DocValue,
) -> Option<&'d mut DocValue> {
    if let Some((Step::Field(name), parents)) = steps.split_last() {
        let doc: &mut Document = if parents.is_empty() {
            &mut *base
        } else {
            locate_mut(&mut *base, parents)?.as_document_mut()?
        };
        if doc.get(*name).is_none_or(DocValue::is_null) {
            doc.set(name, default);
        }
    }
    locate_mut(base, steps)
}
