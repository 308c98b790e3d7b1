//! Transportes de prueba compartidos por los tests de integración.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use async_trait::async_trait;
use mes_client::session::logic::AuthObserver;
use mes_client::transport::domain::{ApiError, ApiRequest, Transport};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};


/// Petición retenida hasta que el test decide cómo y cuándo responderla.
pub struct Pending {
    pub request: ApiRequest,
    reply: oneshot::Sender<Result<Value, ApiError>>,
}


impl Pending {
    pub fn respond(self, result: Result<Value, ApiError>) {
        let _ = self.reply.send(result);
    }
}


/// Transporte que entrega cada petición al test, permitiendo resolverlas en
/// cualquier orden.
pub struct GatedTransport {
    tx: mpsc::UnboundedSender<Pending>,
}


pub struct Gate {
    rx: AsyncMutex<mpsc::UnboundedReceiver<Pending>>,
}


impl Gate {
    pub async fn next(&self) -> Pending {
        self.rx.lock().await.recv().await.expect("transporte liberado")
    }
}


pub fn gated() -> (GatedTransport, Gate) {
    let (tx, rx) = mpsc::unbounded_channel();
    (GatedTransport { tx }, Gate { rx: AsyncMutex::new(rx) })
}


#[async_trait]
impl Transport for GatedTransport {
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let (reply, wait) = oneshot::channel();
        self.tx
            .send(Pending { request, reply })
            .map_err(|_| ApiError::Network("gate cerrado".into()))?;
        wait.await.unwrap_or_else(|_| Err(ApiError::Network("respuesta abandonada".into())))
    }
}


#[derive(Default)]
pub struct RecordingObserver {
    calls: AtomicUsize,
}


impl RecordingObserver {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}


#[async_trait]
impl AuthObserver for RecordingObserver {
    async fn on_auth_failure(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}


pub fn equipment_json(id: u64, status: &str) -> Value {
    json!({
        "id": id,
        "code": format!("EQ-{id:03}"),
        "name": format!("Equipo {id}"),
        "type": "production",
        "status": status,
    })
}


pub fn page_json(list: Vec<Value>, total: u64, page: u32, page_size: u32) -> Value {
    json!({"list": list, "total": total, "page": page, "page_size": page_size})
}


/// Backend en memoria con el contrato de `/users` y `/equipment`, más lecturas
/// fijas registradas con `serve`.
///
/// Responde con el sobre `{code, message, data}` ya desenvuelto, como lo
/// haría `HttpTransport`.
pub struct FakeServer {
    equipment: Mutex<Vec<Value>>,
    next_id: AtomicUsize,
    token_valid: AtomicBool,
    requests: Mutex<Vec<ApiRequest>>,
    canned: Mutex<HashMap<String, Value>>,
}


impl FakeServer {
    pub fn new() -> Self {
        Self {
            equipment: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            token_valid: AtomicBool::new(true),
            requests: Mutex::new(Vec::new()),
            canned: Mutex::new(HashMap::new()),
        }
    }

    pub fn seed_equipment(&self, count: usize, status: &str) {
        let mut equipment = self.equipment.lock().unwrap();
        for _ in 0..count {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u64;
            equipment.push(equipment_json(id, status));
        }
    }

    pub fn equipment_count(&self) -> usize {
        self.equipment.lock().unwrap().len()
    }

    /// A partir de ahora toda petición autenticada recibe 401.
    pub fn expire_tokens(&self) {
        self.token_valid.store(false, Ordering::SeqCst);
    }

    /// Responde `data` a todo `GET path`, sin mirar la query.
    pub fn serve(&self, path: &str, data: Value) {
        self.canned.lock().unwrap().insert(path.to_string(), data);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn list(&self, query: &[(String, String)]) -> Value {
        let param = |key: &str| query.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
        let page: u32 = param("page").and_then(|v| v.parse().ok()).unwrap_or(1);
        let page_size: u32 = param("page_size").and_then(|v| v.parse().ok()).unwrap_or(10);
        let status = param("status");

        let equipment = self.equipment.lock().unwrap();
        let matching: Vec<Value> = equipment
            .iter()
            .filter(|e| status.as_deref().is_none_or(|s| e["status"] == s))
            .cloned()
            .collect();
        let total = matching.len() as u64;
        let list = matching
            .into_iter()
            .skip(((page - 1) * page_size) as usize)
            .take(page_size as usize)
            .collect();
        page_json(list, total, page, page_size)
    }

    fn position(&self, path: &str) -> Result<(usize, u64), ApiError> {
        let id: u64 = path
            .trim_start_matches("/equipment/")
            .parse()
            .map_err(|_| ApiError::NotFound("ruta desconocida".into()))?;
        self.equipment
            .lock()
            .unwrap()
            .iter()
            .position(|e| e["id"] == id)
            .map(|index| (index, id))
            .ok_or_else(|| ApiError::NotFound("设备不存在".into()))
    }
}


#[async_trait]
impl Transport for FakeServer {
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        self.requests.lock().unwrap().push(request.clone());

        if request.path == "/users/login" {
            let body = request.body.unwrap_or(Value::Null);
            if body["password"] != "secret" {
                return Err(ApiError::Validation("用户名或密码错误".into()));
            }
            self.token_valid.store(true, Ordering::SeqCst);
            let username = body["username"].clone();
            return Ok(json!({
                "token": "jwt.fake",
                "user_info": {"id": 1, "username": username, "real_name": "Admin", "role": "admin", "status": 1}
            }));
        }

        if !self.token_valid.load(Ordering::SeqCst) {
            return Err(ApiError::Auth("token expired".into()));
        }

        let ApiRequest { method, path, body, query } = request;

        if method == Method::GET && path == "/users/profile" {
            return Ok(json!({"id": 1, "username": "admin", "real_name": "Admin", "role": "admin", "status": 1}));
        }
        if method == Method::GET {
            if let Some(data) = self.canned.lock().unwrap().get(&path) {
                return Ok(data.clone());
            }
        }
        if path == "/equipment" {
            if method == Method::GET {
                return Ok(self.list(&query));
            }
            if method == Method::POST {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u64;
                let mut record = body.unwrap_or(Value::Null);
                record["id"] = json!(id);
                self.equipment.lock().unwrap().push(record.clone());
                return Ok(record);
            }
        }

        let (index, _) = self.position(&path)?;
        let mut equipment = self.equipment.lock().unwrap();
        if method == Method::PUT {
            if let (Some(target), Some(Value::Object(patch))) = (equipment[index].as_object_mut(), body) {
                target.extend(patch);
            }
            Ok(equipment[index].clone())
        } else if method == Method::DELETE {
            equipment.remove(index);
            Ok(Value::Null)
        } else {
            Ok(equipment[index].clone())
        }
    }
}
